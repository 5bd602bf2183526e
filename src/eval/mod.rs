//! Position evaluation.
//!
//! Scores a position from white's point of view using a trained
//! feed-forward network.

pub mod neural;

pub use neural::{evaluate, rescale_output, Evaluator};
