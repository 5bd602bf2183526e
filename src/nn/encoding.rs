//! Position -> feature vector encoding for network inference.
//!
//! Produces a flat [69] f64 vector. Layout:
//!   [0:64]  square values, rank 8 to rank 1, file a to file h within a rank.
//!           0 for an empty square, otherwise piece value times color sign
//!           (white +1, black -1). Values: P=1, N=3, B=3, R=5, Q=9, K=100.
//!   [64]    side to move: +1 white, -1 black
//!   [65:69] castling rights: [white K, white Q, black k, black q], 1 or 0

use crate::board::position::{Occupant, PieceKind, PositionView};

/// Number of board squares.
pub const NUM_SQUARES: usize = 64;

/// Index of the side-to-move feature.
pub const SIDE_TO_MOVE_INDEX: usize = 64;

/// Index of the first castling feature.
pub const CASTLING_OFFSET: usize = 65;

/// Total feature vector length.
pub const FEATURE_LEN: usize = 69;

/// Encoded position, as consumed by the network.
pub type FeatureVector = [f64; FEATURE_LEN];

/// Material value of a piece kind, regardless of color.
#[inline]
pub fn piece_value(kind: PieceKind) -> f64 {
    kind.value()
}

/// Signed value of a square: 0 when empty.
#[inline]
pub fn square_value(occupant: Option<Occupant>) -> f64 {
    match occupant {
        Some(o) => piece_value(o.kind) * o.side.sign(),
        None => 0.0,
    }
}

/// Encodes a position into its feature vector.
pub fn encode_position<P: PositionView + ?Sized>(position: &P) -> FeatureVector {
    let mut features = [0.0f64; FEATURE_LEN];

    for row in 0..8 {
        for col in 0..8 {
            features[row * 8 + col] = square_value(position.occupant(row, col));
        }
    }

    features[SIDE_TO_MOVE_INDEX] = position.side_to_move().sign();

    for (i, present) in position.castling_rights().flags().into_iter().enumerate() {
        features[CASTLING_OFFSET + i] = if present { 1.0 } else { 0.0 };
    }

    features
}
