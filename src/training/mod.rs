//! Training data construction and model training.
//!
//! Turns (position, raw evaluation) pairs into network samples, trains a
//! fresh network on a curriculum, and persists the result.
//!
//! Raw evaluations live in [-10, 10] and are normalized linearly to the
//! network's [0, 1] output range. Values outside that domain are rejected
//! rather than clamped.

pub mod curriculum;

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::board::position::PositionView;
use crate::board::rules::{ChessRules, PositionError};
use crate::nn::encoding::{encode_position, FeatureVector};
use crate::nn::model::{save_model, ModelError, DEFAULT_MODEL_PATH};
use crate::nn::network::{
    FeedForward, NetworkConfig, TrainableFunction, TrainingOptions, TrainingResult,
};

pub use curriculum::{load_curriculum, load_curriculum_from_str, Curriculum, LabeledPosition};

/// Lower bound of the raw evaluation domain.
pub const EVAL_MIN: f64 = -10.0;

/// Upper bound of the raw evaluation domain.
pub const EVAL_MAX: f64 = 10.0;

/// Errors raised while building training samples.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("raw evaluation {0} is outside [-10, 10]")]
    OutOfDomainTarget(f64),
}

/// Errors raised by a full training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("curriculum {}: {reason}", path.display())]
    Curriculum { path: PathBuf, reason: String },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("invalid training settings: {0}")]
    InvalidConfig(String),

    #[error("training diverged after {iterations} iterations (error {error}); no model written")]
    Diverged { iterations: usize, error: f64 },
}

/// One network training example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub input: FeatureVector,
    /// Normalized target in [0, 1].
    pub target: f64,
}

impl TrainingSample {
    /// Expected network outputs.
    pub fn output(&self) -> [f64; 1] {
        [self.target]
    }
}

/// Maps a raw evaluation in [-10, 10] to [0, 1].
#[inline]
pub fn normalize_target(raw: f64) -> f64 {
    (raw - EVAL_MIN) / (EVAL_MAX - EVAL_MIN)
}

/// Inverse of [`normalize_target`].
#[inline]
pub fn denormalize_target(normalized: f64) -> f64 {
    normalized * (EVAL_MAX - EVAL_MIN) + EVAL_MIN
}

/// Encodes a position and normalizes its evaluation.
pub fn build_sample<P: PositionView + ?Sized>(
    position: &P,
    raw_evaluation: f64,
) -> Result<TrainingSample, SampleError> {
    if !(EVAL_MIN..=EVAL_MAX).contains(&raw_evaluation) {
        return Err(SampleError::OutOfDomainTarget(raw_evaluation));
    }
    Ok(TrainingSample {
        input: encode_position(position),
        target: normalize_target(raw_evaluation),
    })
}

/// Builds samples for every (position, raw evaluation) pair, keeping input
/// order.
pub fn generate_training_set<P: PositionView + Sync>(
    samples: &[(P, f64)],
) -> Result<Vec<TrainingSample>, SampleError> {
    samples
        .par_iter()
        .map(|(position, raw)| build_sample(position, *raw))
        .collect()
}

/// Parses every curriculum position and builds its sample.
pub fn samples_from_curriculum<R: ChessRules>(
    rules: &R,
    curriculum: &Curriculum,
) -> Result<Vec<TrainingSample>, TrainError> {
    let labeled = curriculum
        .samples
        .iter()
        .map(|s| rules.parse(&s.fen).map(|position| (position, s.evaluation)))
        .collect::<Result<Vec<_>, PositionError>>()?;
    Ok(generate_training_set(&labeled)?)
}

/// Settings for a full training run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Where the trained model is written.
    pub model_path: PathBuf,
    /// Curriculum file; the bundled curriculum when None.
    pub curriculum_path: Option<PathBuf>,
    pub network: NetworkConfig,
    pub options: TrainingOptions,
}

impl TrainConfig {
    /// Checks network and stopping settings before any work is done.
    pub fn validate(&self) -> Result<(), TrainError> {
        self.network.validate().map_err(TrainError::InvalidConfig)?;
        self.options.validate().map_err(TrainError::InvalidConfig)
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            curriculum_path: None,
            network: NetworkConfig::default(),
            options: TrainingOptions::default(),
        }
    }
}

/// What a training run produced.
pub struct TrainOutcome {
    pub network: FeedForward,
    pub result: TrainingResult,
    pub sample_count: usize,
}

/// Fails on a non-finite training error.
fn ensure_finite(result: TrainingResult) -> Result<TrainingResult, TrainError> {
    if result.diverged() {
        return Err(TrainError::Diverged {
            iterations: result.iterations,
            error: result.error,
        });
    }
    Ok(result)
}

/// Trains a fresh network on the configured curriculum and saves it. Nothing
/// is written when the settings are invalid or training diverges.
pub fn train_model<R: ChessRules>(
    rules: &R,
    config: &TrainConfig,
) -> Result<TrainOutcome, TrainError> {
    config.validate()?;

    let curriculum = match &config.curriculum_path {
        Some(path) => load_curriculum(path).map_err(|reason| TrainError::Curriculum {
            path: path.clone(),
            reason,
        })?,
        None => Curriculum::default_set(),
    };

    let samples = samples_from_curriculum(rules, &curriculum)?;
    if samples.is_empty() {
        return Err(TrainError::EmptyTrainingSet);
    }
    debug!(count = samples.len(), "built training samples");

    let mut network = FeedForward::new(&config.network);
    let result = ensure_finite(network.train(&samples, &config.options))?;

    let mut model = network.serialize();
    model.training = Some(result);
    save_model(&config.model_path, &model)?;
    info!(
        path = %config.model_path.display(),
        iterations = result.iterations,
        error = result.error,
        "model saved"
    );

    Ok(TrainOutcome {
        network,
        result,
        sample_count: samples.len(),
    })
}
