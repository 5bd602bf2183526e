//! Neural network position evaluation.
//!
//! Encodes a position, runs it through a trained network, and rescales the
//! [0, 1] output to a score in [-1, 1] (positive favors white).

use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::board::position::PositionView;
use crate::nn::encoding::encode_position;
use crate::nn::model::{load_model, ModelError};
use crate::nn::network::{FeedForward, TrainableFunction};

/// Maps a raw network output in [0, 1] to a score in [-1, 1].
#[inline]
pub fn rescale_output(raw: f64) -> f64 {
    (raw * 2.0 - 1.0).clamp(-1.0, 1.0)
}

/// Evaluates a position with any trainable function. Only the first output
/// is used.
///
/// # Panics
///
/// Panics if `function` returns no outputs.
pub fn evaluate<P, F>(position: &P, function: &F) -> f64
where
    P: PositionView + ?Sized,
    F: TrainableFunction + ?Sized,
{
    let features = encode_position(position);
    let output = function.run(&features);
    let raw = output
        .first()
        .copied()
        .expect("trainable function returned no outputs");
    rescale_output(raw)
}

/// Evaluator holding an optional trained function.
pub struct Evaluator<F = FeedForward> {
    function: Option<F>,
}

impl<F: TrainableFunction + Sync> Evaluator<F> {
    /// Wraps an already trained function.
    pub fn new(function: F) -> Self {
        Evaluator {
            function: Some(function),
        }
    }

    /// An evaluator with no model. Every evaluation fails with `NotLoaded`.
    pub fn unloaded() -> Self {
        Evaluator { function: None }
    }

    /// Rebuilds the function from its serialized state.
    pub fn from_state(state: F::State) -> Result<Self, String> {
        F::deserialize(state).map(Evaluator::new)
    }

    /// Returns true if a function is loaded.
    pub fn is_loaded(&self) -> bool {
        self.function.is_some()
    }

    pub fn function(&self) -> Option<&F> {
        self.function.as_ref()
    }

    /// Scores one position.
    pub fn evaluate<P: PositionView + ?Sized>(&self, position: &P) -> Result<f64, ModelError> {
        let function = self.function.as_ref().ok_or(ModelError::NotLoaded)?;
        Ok(evaluate(position, function))
    }

    /// Scores many positions in parallel. Results follow input order.
    pub fn evaluate_batch<P: PositionView + Sync>(
        &self,
        positions: &[P],
    ) -> Result<Vec<f64>, ModelError> {
        let function = self.function.as_ref().ok_or(ModelError::NotLoaded)?;
        Ok(positions
            .par_iter()
            .map(|position| evaluate(position, function))
            .collect())
    }
}

impl Evaluator<FeedForward> {
    /// Loads a model file written by training.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let model = load_model(path)?;
        let evaluator = Self::from_state(model).map_err(|reason| ModelError::FileCorrupt {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(path = %path.display(), "evaluator ready");
        Ok(evaluator)
    }
}
