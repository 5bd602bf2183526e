//! Neural network plumbing.
//!
//! Converts positions into the 69-element feature vector fed to the
//! evaluation network, and holds the feed-forward network itself together
//! with its JSON model format.

pub mod encoding;
pub mod model;
pub mod network;

pub use encoding::{encode_position, FeatureVector, FEATURE_LEN};
pub use model::{load_model, save_model, Model, ModelError, DEFAULT_MODEL_PATH};
pub use network::{FeedForward, NetworkConfig, TrainableFunction, TrainingOptions, TrainingResult};
