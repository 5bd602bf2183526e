//! Training curricula.
//!
//! A curriculum is an ordered list of FEN positions with raw evaluations in
//! [-10, 10], read from JSON. Order is meaningful: samples are fed to the
//! network in the order they appear (openings before middlegames before
//! endgames in the bundled set).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The bundled curriculum.
const DEFAULT_CURRICULUM: &str = include_str!("../../data/curriculum.json");

/// An ordered set of labeled positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub samples: Vec<LabeledPosition>,
}

/// A position descriptor with its raw evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPosition {
    pub fen: String,
    /// Raw evaluation, positive favors white. Expected in [-10, 10].
    pub evaluation: f64,
    #[serde(default)]
    pub label: String,
}

impl Curriculum {
    /// The curriculum shipped with the crate.
    pub fn default_set() -> Curriculum {
        load_curriculum_from_str(DEFAULT_CURRICULUM).expect("failed to parse bundled curriculum")
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Loads a curriculum from a JSON file at the given path.
pub fn load_curriculum(path: &Path) -> Result<Curriculum, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    load_curriculum_from_str(&data)
}

/// Loads a curriculum from a JSON string.
pub fn load_curriculum_from_str(json: &str) -> Result<Curriculum, String> {
    serde_json::from_str(json).map_err(|e| format!("failed to parse curriculum JSON: {}", e))
}
