//! JSON model persistence.
//!
//! A trained network is stored as a single JSON document holding the layer
//! sizes, learning parameters, per-layer weights and biases, and the result
//! of the training run that produced it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::encoding::FEATURE_LEN;
use super::network::TrainingResult;

/// Where the CLI reads and writes the model unless told otherwise.
pub const DEFAULT_MODEL_PATH: &str = "models/chess-model.json";

/// Current model file format version.
pub const MODEL_VERSION: u32 = 1;

/// Errors from loading, saving, or using a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no model loaded; train a model first")]
    NotLoaded,

    #[error("model file not found: {}; train a model first", .0.display())]
    FileMissing(PathBuf),

    #[error("model file {} is corrupt: {reason}", path.display())]
    FileCorrupt { path: PathBuf, reason: String },

    #[error("failed to read model file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write model file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Weights and biases of one fully connected layer.
/// `weights[node][input]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerParams {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// The persisted form of a trained network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub version: u32,
    pub sizes: Vec<usize>,
    pub learning_rate: f64,
    pub momentum: f64,
    pub layers: Vec<LayerParams>,
    #[serde(default)]
    pub training: Option<TrainingResult>,
}

impl Model {
    /// Checks that the layer shapes agree with `sizes` and that the network
    /// maps a feature vector to a single output.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != MODEL_VERSION {
            return Err(format!("unsupported model version {}", self.version));
        }
        if self.sizes.len() < 2 {
            return Err(format!("expected at least 2 layer sizes, got {}", self.sizes.len()));
        }
        if self.sizes[0] != FEATURE_LEN {
            return Err(format!(
                "input size {} does not match feature length {}",
                self.sizes[0], FEATURE_LEN
            ));
        }
        if self.sizes[self.sizes.len() - 1] != 1 {
            return Err(format!(
                "output size must be 1, got {}",
                self.sizes[self.sizes.len() - 1]
            ));
        }
        if self.layers.len() != self.sizes.len() - 1 {
            return Err(format!(
                "expected {} layers, got {}",
                self.sizes.len() - 1,
                self.layers.len()
            ));
        }
        for (i, (layer, pair)) in self.layers.iter().zip(self.sizes.windows(2)).enumerate() {
            let (inputs, nodes) = (pair[0], pair[1]);
            if layer.biases.len() != nodes || layer.weights.len() != nodes {
                return Err(format!("layer {} should have {} nodes", i, nodes));
            }
            if layer.weights.iter().any(|w| w.len() != inputs) {
                return Err(format!("layer {} should have {} inputs per node", i, inputs));
            }
        }
        Ok(())
    }
}

/// Writes a model as JSON, creating parent directories. Overwrites any
/// existing file.
pub fn save_model(path: &Path, model: &Model) -> Result<(), ModelError> {
    let write_err = |source: io::Error| ModelError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string(model).map_err(|e| write_err(e.into()))?;
    fs::write(path, json).map_err(write_err)?;
    debug!(path = %path.display(), "saved model");
    Ok(())
}

/// Reads and validates a model file.
pub fn load_model(path: &Path) -> Result<Model, ModelError> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ModelError::FileMissing(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ModelError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    load_model_from_str(&data).map_err(|reason| ModelError::FileCorrupt {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parses and validates a model from a JSON string.
pub fn load_model_from_str(json: &str) -> Result<Model, String> {
    let model: Model =
        serde_json::from_str(json).map_err(|e| format!("failed to parse model JSON: {}", e))?;
    model.validate()?;
    debug!(sizes = ?model.sizes, "loaded model");
    Ok(model)
}
