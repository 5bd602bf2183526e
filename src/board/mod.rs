//! Chess position access.
//!
//! Wraps the external chess rules library behind the [`ChessRules`] trait and
//! exposes the read-only [`PositionView`] the encoder consumes.

pub mod position;
pub mod rules;

pub use position::{CastlingRights, Grid, Occupant, PieceKind, PositionView, Side};
pub use rules::{ChessRules, LenientRules, PositionError, StandardRules, START_FEN};
