//! Reference position suite.
//!
//! A fixed set of positions with the score a reasonable evaluator should
//! land near. Running the suite reports how far a trained model is from
//! each expectation. It is a sanity check, not a pass/fail gate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::rules::{ChessRules, PositionError};
use crate::eval::Evaluator;
use crate::nn::model::ModelError;
use crate::nn::network::TrainableFunction;

/// The bundled reference positions.
const DEFAULT_SUITE: &str = include_str!("../data/test_positions.json");

#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("suite {}: {reason}", path.display())]
    Suite { path: PathBuf, reason: String },
}

/// One reference position with its expected score in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteCase {
    pub fen: String,
    pub expected: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    pub positions: Vec<SuiteCase>,
}

impl Suite {
    /// The suite shipped with the crate.
    pub fn default_set() -> Suite {
        load_suite_from_str(DEFAULT_SUITE).expect("failed to parse bundled suite")
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Loads a suite from a JSON file at the given path.
pub fn load_suite(path: &Path) -> Result<Suite, SuiteError> {
    let suite_err = |reason| SuiteError::Suite {
        path: path.to_path_buf(),
        reason,
    };
    let data = fs::read_to_string(path).map_err(|e| suite_err(format!("failed to read: {}", e)))?;
    load_suite_from_str(&data).map_err(suite_err)
}

/// Loads a suite from a JSON string.
pub fn load_suite_from_str(json: &str) -> Result<Suite, String> {
    serde_json::from_str(json).map_err(|e| format!("failed to parse suite JSON: {}", e))
}

/// Score of a single reference position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub description: String,
    pub fen: String,
    pub expected: f64,
    pub score: f64,
    pub abs_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub cases: Vec<CaseReport>,
    /// Zero for an empty suite.
    pub mean_abs_error: f64,
}

/// Scores every suite position in order.
pub fn run_suite<R, F>(
    rules: &R,
    evaluator: &Evaluator<F>,
    suite: &Suite,
) -> Result<SuiteReport, SuiteError>
where
    R: ChessRules,
    F: TrainableFunction + Sync,
{
    let mut cases = Vec::with_capacity(suite.len());
    for case in &suite.positions {
        let position = rules.parse(&case.fen)?;
        let score = evaluator.evaluate(&position)?;
        cases.push(CaseReport {
            description: case.description.clone(),
            fen: case.fen.clone(),
            expected: case.expected,
            score,
            abs_error: (score - case.expected).abs(),
        });
    }

    let mean_abs_error = if cases.is_empty() {
        0.0
    } else {
        cases.iter().map(|c| c.abs_error).sum::<f64>() / cases.len() as f64
    };
    debug!(cases = cases.len(), mean_abs_error, "suite finished");

    Ok(SuiteReport {
        cases,
        mean_abs_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::rules::{LenientRules, StandardRules};
    use crate::nn::network::{FeedForward, NetworkConfig};

    fn evaluator() -> Evaluator {
        Evaluator::new(FeedForward::new(&NetworkConfig {
            hidden_layers: vec![10, 5],
            seed: 5,
            ..NetworkConfig::default()
        }))
    }

    #[test]
    fn bundled_suite() {
        let suite = Suite::default_set();
        assert_eq!(suite.len(), 8);
        assert_eq!(suite.positions[0].expected, 0.0);
        assert_eq!(suite.positions[6].expected, 0.7);
        assert_eq!(suite.positions[7].expected, -0.7);
        for case in &suite.positions {
            assert!(StandardRules.parse(&case.fen).is_ok(), "{}", case.fen);
        }
    }

    #[test]
    fn report_has_one_case_per_position() {
        let evaluator = evaluator();
        let suite = Suite::default_set();
        let report = run_suite(&StandardRules, &evaluator, &suite).unwrap();

        assert_eq!(report.cases.len(), suite.len());
        for (case, reported) in suite.positions.iter().zip(&report.cases) {
            assert_eq!(reported.fen, case.fen);
            assert_eq!(reported.abs_error, (reported.score - case.expected).abs());
            assert!((-1.0..=1.0).contains(&reported.score));
        }
        let mean = report.cases.iter().map(|c| c.abs_error).sum::<f64>() / 8.0;
        assert!((report.mean_abs_error - mean).abs() < 1e-12);
    }

    #[test]
    fn empty_suite_has_zero_error() {
        let suite = load_suite_from_str(r#"{ "positions": [] }"#).unwrap();
        let report = run_suite(&StandardRules, &evaluator(), &suite).unwrap();
        assert!(report.cases.is_empty());
        assert_eq!(report.mean_abs_error, 0.0);
    }

    #[test]
    fn unloaded_evaluator_propagates() {
        let evaluator = Evaluator::<FeedForward>::unloaded();
        let result = run_suite(&StandardRules, &evaluator, &Suite::default_set());
        assert!(matches!(result, Err(SuiteError::Model(ModelError::NotLoaded))));
    }

    #[test]
    fn bad_position_propagates() {
        let suite = load_suite_from_str(
            r#"{ "positions": [ { "fen": "8/8/8/8/8/8/4P3/4K3 w - - 0 1", "expected": 0.5 } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            run_suite(&StandardRules, &evaluator(), &suite),
            Err(SuiteError::Position(_))
        ));
        assert_eq!(
            run_suite(&LenientRules, &evaluator(), &suite)
                .unwrap()
                .cases
                .len(),
            1
        );
    }

    #[test]
    fn missing_suite_file_keeps_path() {
        let path = PathBuf::from("/nonexistent/suite.json");
        match load_suite(&path) {
            Err(SuiteError::Suite { path: reported, reason }) => {
                assert_eq!(reported, path);
                assert!(reason.contains("failed to read"));
            }
            other => panic!("expected Suite error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_suite_is_rejected() {
        let err = load_suite_from_str("[]").unwrap_err();
        assert!(err.contains("failed to parse suite JSON"));
    }
}
