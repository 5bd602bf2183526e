//! Read-only view of a chess position.
//!
//! The encoder never talks to the chess library directly. It reads squares,
//! side to move, and castling rights through [`PositionView`], which is
//! implemented for both the strict `chess::Board` and the unchecked
//! `chess::BoardBuilder`.

use chess::{Board, BoardBuilder, CastleRights, Color, File, Piece, Rank, Square};

/// The side to move, or the owner of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// +1 for white, -1 for black.
    pub const fn sign(self) -> f64 {
        match self {
            Side::White => 1.0,
            Side::Black => -1.0,
        }
    }

    /// Returns the single-character FEN abbreviation.
    pub const fn fen_char(self) -> char {
        match self {
            Side::White => 'w',
            Side::Black => 'b',
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

/// The kind of a chess piece, independent of its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Material value used by the feature encoding.
    pub const fn value(self) -> f64 {
        match self {
            PieceKind::Pawn => 1.0,
            PieceKind::Knight => 3.0,
            PieceKind::Bishop => 3.0,
            PieceKind::Rook => 5.0,
            PieceKind::Queen => 9.0,
            PieceKind::King => 100.0,
        }
    }
}

impl From<Piece> for PieceKind {
    fn from(piece: Piece) -> Self {
        match piece {
            Piece::Pawn => PieceKind::Pawn,
            Piece::Knight => PieceKind::Knight,
            Piece::Bishop => PieceKind::Bishop,
            Piece::Rook => PieceKind::Rook,
            Piece::Queen => PieceKind::Queen,
            Piece::King => PieceKind::King,
        }
    }
}

/// A piece standing on a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occupant {
    pub kind: PieceKind,
    pub side: Side,
}

impl Occupant {
    pub const fn new(kind: PieceKind, side: Side) -> Self {
        Occupant { kind, side }
    }
}

/// Castling availability for both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    /// All four rights present (`KQkq`).
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    /// Reads the FEN castling field. Any subset of `KQkq` is accepted;
    /// `-` and unknown characters grant nothing.
    pub fn from_fen_field(field: &str) -> Self {
        CastlingRights {
            white_kingside: field.contains('K'),
            white_queenside: field.contains('Q'),
            black_kingside: field.contains('k'),
            black_queenside: field.contains('q'),
        }
    }

    /// Writes the FEN castling field, `-` when no right remains.
    pub fn to_fen_field(&self) -> String {
        let mut field = String::with_capacity(4);
        for (present, c) in [
            (self.white_kingside, 'K'),
            (self.white_queenside, 'Q'),
            (self.black_kingside, 'k'),
            (self.black_queenside, 'q'),
        ] {
            if present {
                field.push(c);
            }
        }
        if field.is_empty() {
            field.push('-');
        }
        field
    }

    /// Flags in encoding order: white kingside, white queenside,
    /// black kingside, black queenside.
    pub const fn flags(&self) -> [bool; 4] {
        [
            self.white_kingside,
            self.white_queenside,
            self.black_kingside,
            self.black_queenside,
        ]
    }

    fn from_library(white: CastleRights, black: CastleRights) -> Self {
        CastlingRights {
            white_kingside: white.has_kingside(),
            white_queenside: white.has_queenside(),
            black_kingside: black.has_kingside(),
            black_queenside: black.has_queenside(),
        }
    }
}

/// 8x8 board contents. Row 0 is rank 8, column 0 is file a.
pub type Grid = [[Option<Occupant>; 8]; 8];

/// Maps a (row, column) pair in rank-8-first order to a library square.
fn square_at(row: usize, col: usize) -> Square {
    Square::make_square(Rank::from_index(7 - row), File::from_index(col))
}

/// Read access to the parts of a position the evaluator consumes.
pub trait PositionView {
    /// Piece on the square at `row` (0 = rank 8) and `col` (0 = file a).
    fn occupant(&self, row: usize, col: usize) -> Option<Occupant>;

    fn side_to_move(&self) -> Side;

    fn castling_rights(&self) -> CastlingRights;

    /// Full board contents, rank 8 first.
    fn grid(&self) -> Grid {
        let mut grid = [[None; 8]; 8];
        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = self.occupant(row, col);
            }
        }
        grid
    }
}

impl PositionView for Board {
    fn occupant(&self, row: usize, col: usize) -> Option<Occupant> {
        let sq = square_at(row, col);
        let piece = self.piece_on(sq)?;
        let color = self.color_on(sq)?;
        Some(Occupant::new(piece.into(), color.into()))
    }

    fn side_to_move(&self) -> Side {
        Board::side_to_move(self).into()
    }

    fn castling_rights(&self) -> CastlingRights {
        CastlingRights::from_library(
            self.castle_rights(Color::White),
            self.castle_rights(Color::Black),
        )
    }
}

impl PositionView for BoardBuilder {
    fn occupant(&self, row: usize, col: usize) -> Option<Occupant> {
        self[square_at(row, col)].map(|(piece, color)| Occupant::new(piece.into(), color.into()))
    }

    fn side_to_move(&self) -> Side {
        self.get_side_to_move().into()
    }

    fn castling_rights(&self) -> CastlingRights {
        CastlingRights::from_library(
            self.get_castle_rights(Color::White),
            self.get_castle_rights(Color::Black),
        )
    }
}
