//! chessnet: a neural chess position evaluator.
//!
//! Exposes the position encoder, the feed-forward network and its model
//! format, the evaluator, training data construction, and the reference
//! suite for use by integration tests and the binary entry point.

pub mod board;
pub mod eval;
pub mod nn;
pub mod suite;
pub mod training;
