//! Chess rule capability.
//!
//! Parsing, move application, and FEN serialization are delegated to the
//! `chess` crate. Two adapters are provided: [`StandardRules`] accepts only
//! positions the library considers sane, while [`LenientRules`] accepts any
//! structurally valid FEN (for example a lone king and pawn) so that such
//! positions can still be encoded and evaluated.

use std::str::FromStr;

use chess::{Board, BoardBuilder, ChessMove, MoveGen};

use super::position::{CastlingRights, Grid, PositionView, Side};

/// The standard initial position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors raised at the chess-rules boundary.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("invalid position descriptor '{descriptor}': {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    #[error("illegal move '{mv}' in position '{descriptor}'")]
    IllegalMove { mv: String, descriptor: String },
}

/// Operations the evaluator needs from a chess rules implementation.
pub trait ChessRules {
    type Position: PositionView + Clone + Send + Sync;

    /// Parses a FEN descriptor.
    fn parse(&self, descriptor: &str) -> Result<Self::Position, PositionError>;

    /// Legal moves in UCI notation.
    fn legal_moves(&self, position: &Self::Position) -> Vec<String>;

    /// Applies a move given in UCI (`e2e4`) or SAN (`Nf3`) notation.
    fn apply_move(
        &self,
        position: &Self::Position,
        mv: &str,
    ) -> Result<Self::Position, PositionError>;

    /// Serializes back to FEN.
    fn serialize(&self, position: &Self::Position) -> String;

    fn board(&self, position: &Self::Position) -> Grid {
        position.grid()
    }

    fn turn(&self, position: &Self::Position) -> Side {
        position.side_to_move()
    }

    fn castling_rights(&self, position: &Self::Position) -> CastlingRights {
        position.castling_rights()
    }
}

/// Rules backed by `chess::Board`. Rejects positions the library deems
/// insane (missing kings, side not to move in check, and so on).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl ChessRules for StandardRules {
    type Position = Board;

    fn parse(&self, descriptor: &str) -> Result<Board, PositionError> {
        Board::from_str(descriptor.trim()).map_err(|e| PositionError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason: e.to_string(),
        })
    }

    fn legal_moves(&self, position: &Board) -> Vec<String> {
        MoveGen::new_legal(position).map(|m| m.to_string()).collect()
    }

    fn apply_move(&self, position: &Board, mv: &str) -> Result<Board, PositionError> {
        let chess_move = resolve_move(position, mv).ok_or_else(|| PositionError::IllegalMove {
            mv: mv.to_string(),
            descriptor: position.to_string(),
        })?;
        Ok(position.make_move_new(chess_move))
    }

    fn serialize(&self, position: &Board) -> String {
        with_target_en_passant(position.to_string())
    }
}

/// Rules backed by `chess::BoardBuilder`. Any structurally valid FEN parses;
/// move generation is only available when the position is also sane.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientRules;

impl ChessRules for LenientRules {
    type Position = BoardBuilder;

    fn parse(&self, descriptor: &str) -> Result<BoardBuilder, PositionError> {
        BoardBuilder::from_str(descriptor.trim()).map_err(|e| PositionError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason: e.to_string(),
        })
    }

    fn legal_moves(&self, position: &BoardBuilder) -> Vec<String> {
        match Board::try_from(position) {
            Ok(board) => StandardRules.legal_moves(&board),
            Err(_) => Vec::new(),
        }
    }

    fn apply_move(&self, position: &BoardBuilder, mv: &str) -> Result<BoardBuilder, PositionError> {
        let illegal = || PositionError::IllegalMove {
            mv: mv.to_string(),
            descriptor: position.to_string(),
        };
        let board = Board::try_from(position).map_err(|_| illegal())?;
        let chess_move = resolve_move(&board, mv).ok_or_else(illegal)?;
        Ok(BoardBuilder::from(board.make_move_new(chess_move)))
    }

    fn serialize(&self, position: &BoardBuilder) -> String {
        with_target_en_passant(position.to_string())
    }
}

/// The `chess` crate writes the en passant field as the square of the pawn
/// that just advanced two ranks. FEN wants the square it passed over.
fn with_target_en_passant(fen: String) -> String {
    let mut fields: Vec<String> = fen.split(' ').map(str::to_string).collect();
    if fields.len() < 4 || fields[3].len() != 2 {
        return fen;
    }
    let rank = if fields[1] == "w" { "6" } else { "3" };
    fields[3].replace_range(1..2, rank);
    fields.join(" ")
}

/// Interprets `mv` as UCI first, then SAN. Returns None for illegal moves.
fn resolve_move(board: &Board, mv: &str) -> Option<ChessMove> {
    let mv = mv.trim();
    if let Ok(candidate) = ChessMove::from_str(mv) {
        if board.legal(candidate) {
            return Some(candidate);
        }
    }
    ChessMove::from_san(board, mv)
        .ok()
        .filter(|candidate| board.legal(*candidate))
}
