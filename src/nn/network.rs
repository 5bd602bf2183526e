//! Feed-forward evaluation network.
//!
//! A fully connected network with sigmoid activations on every layer, trained
//! by per-sample back-propagation with momentum. The default shape is
//! 69 -> 128 -> 64 -> 1. The output is a single value in [0, 1].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::encoding::FEATURE_LEN;
use super::model::{LayerParams, Model, MODEL_VERSION};
use crate::training::TrainingSample;

/// Range for initial weights and biases: uniform in [-INIT_RANGE, INIT_RANGE).
const INIT_RANGE: f64 = 0.2;

/// Something that can be fit to (input, target) pairs, run, and persisted.
pub trait TrainableFunction {
    /// Persisted form of the parameters.
    type State: Serialize + DeserializeOwned;

    /// Adjusts internal parameters to fit `samples`, in order.
    fn train(&mut self, samples: &[TrainingSample], options: &TrainingOptions) -> TrainingResult;

    /// Computes the outputs for one input. Does not change parameters.
    /// Returns at least one output.
    fn run(&self, input: &[f64]) -> Vec<f64>;

    /// Captures the current parameters.
    fn serialize(&self) -> Self::State;

    /// Rebuilds a function whose `run` reproduces the serialized one.
    fn deserialize(state: Self::State) -> Result<Self, String>
    where
        Self: Sized;
}

/// Shape and learning parameters of a new network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Hidden layer sizes, input side first.
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Seed for weight initialization (0 = use entropy).
    pub seed: u64,
}

impl NetworkConfig {
    /// Rejects settings that cannot train to finite weights.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(format!(
                "learning rate must be finite and positive, got {}",
                self.learning_rate
            ));
        }
        if !self.momentum.is_finite() {
            return Err(format!("momentum must be finite, got {}", self.momentum));
        }
        if self.hidden_layers.contains(&0) {
            return Err("hidden layers must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_layers: vec![128, 64],
            learning_rate: 0.1,
            momentum: 0.1,
            seed: 0,
        }
    }
}

/// Stopping and logging criteria for a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    /// Maximum number of passes over the training set.
    pub iterations: usize,
    /// Training stops once the mean error drops below this value.
    pub error_threshold: f64,
    pub log_enabled: bool,
    /// Log progress every this many iterations.
    pub log_period: usize,
}

impl TrainingOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.error_threshold.is_finite() && self.error_threshold >= 0.0) {
            return Err(format!(
                "error threshold must be finite and non-negative, got {}",
                self.error_threshold
            ));
        }
        Ok(())
    }
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            iterations: 20_000,
            error_threshold: 0.005,
            log_enabled: true,
            log_period: 1000,
        }
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Passes actually performed.
    pub iterations: usize,
    /// Mean squared error after the last pass.
    pub error: f64,
}

impl TrainingResult {
    /// True when the error is NaN or infinite.
    pub fn diverged(&self) -> bool {
        !self.error.is_finite()
    }
}

/// A fully connected sigmoid network.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForward {
    pub(super) sizes: Vec<usize>,
    pub(super) layers: Vec<LayerParams>,
    pub(super) learning_rate: f64,
    pub(super) momentum: f64,
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LayerParams {
    fn random(inputs: usize, nodes: usize, rng: &mut SmallRng) -> Self {
        LayerParams {
            weights: (0..nodes)
                .map(|_| {
                    (0..inputs)
                        .map(|_| rng.gen_range(-INIT_RANGE..INIT_RANGE))
                        .collect()
                })
                .collect(),
            biases: (0..nodes)
                .map(|_| rng.gen_range(-INIT_RANGE..INIT_RANGE))
                .collect(),
        }
    }

    /// Sigmoid outputs of every node of this layer.
    fn activate(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| sigmoid(b + w.iter().zip(input).map(|(w, x)| w * x).sum::<f64>()))
            .collect()
    }
}

impl FeedForward {
    /// Creates a randomly initialized network taking a feature vector and
    /// producing a single output.
    pub fn new(config: &NetworkConfig) -> Self {
        let mut rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };

        let mut sizes = Vec::with_capacity(config.hidden_layers.len() + 2);
        sizes.push(FEATURE_LEN);
        sizes.extend_from_slice(&config.hidden_layers);
        sizes.push(1);

        let layers = sizes
            .windows(2)
            .map(|pair| LayerParams::random(pair[0], pair[1], &mut rng))
            .collect();

        FeedForward {
            sizes,
            layers,
            learning_rate: config.learning_rate,
            momentum: config.momentum,
        }
    }

    /// Layer sizes, input first.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn input_size(&self) -> usize {
        self.sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Activations of every layer, the input included.
    fn forward(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut outputs = Vec::with_capacity(self.layers.len() + 1);
        outputs.push(input.to_vec());
        for layer in &self.layers {
            let next = layer.activate(&outputs[outputs.len() - 1]);
            outputs.push(next);
        }
        outputs
    }

    /// One back-propagation step. Returns the sample's mean squared error.
    fn train_sample(&mut self, sample: &TrainingSample, changes: &mut [Vec<Vec<f64>>]) -> f64 {
        let outputs = self.forward(&sample.input);
        let target = sample.output();
        let last = self.layers.len() - 1;

        let mut deltas: Vec<Vec<f64>> = vec![Vec::new(); self.layers.len()];
        let mut squared = 0.0;
        deltas[last] = outputs[last + 1]
            .iter()
            .zip(target.iter())
            .map(|(o, t)| {
                let err = t - o;
                squared += err * err;
                err * o * (1.0 - o)
            })
            .collect();

        for l in (0..last).rev() {
            let next_layer = &self.layers[l + 1];
            let next_deltas = &deltas[l + 1];
            let out = &outputs[l + 1];
            let delta: Vec<f64> = (0..out.len())
                .map(|node| {
                    let err: f64 = next_layer
                        .weights
                        .iter()
                        .zip(next_deltas)
                        .map(|(w, d)| w[node] * d)
                        .sum();
                    err * out[node] * (1.0 - out[node])
                })
                .collect();
            deltas[l] = delta;
        }

        let lr = self.learning_rate;
        let momentum = self.momentum;
        for (l, layer) in self.layers.iter_mut().enumerate() {
            let input = &outputs[l];
            for (node, delta) in deltas[l].iter().enumerate() {
                let node_changes = &mut changes[l][node];
                for (k, x) in input.iter().enumerate() {
                    let change = lr * delta * x + momentum * node_changes[k];
                    node_changes[k] = change;
                    layer.weights[node][k] += change;
                }
                layer.biases[node] += lr * delta;
            }
        }

        squared / target.len() as f64
    }
}

impl TrainableFunction for FeedForward {
    type State = Model;

    fn train(&mut self, samples: &[TrainingSample], options: &TrainingOptions) -> TrainingResult {
        if samples.is_empty() {
            return TrainingResult {
                iterations: 0,
                error: 0.0,
            };
        }

        // Previous weight changes, for momentum. Same shape as the weights.
        let mut changes: Vec<Vec<Vec<f64>>> = self
            .layers
            .iter()
            .map(|layer| layer.weights.iter().map(|w| vec![0.0; w.len()]).collect())
            .collect();

        let mut error = 1.0;
        let mut iterations = 0;
        while iterations < options.iterations && error > options.error_threshold {
            iterations += 1;
            let total: f64 = samples
                .iter()
                .map(|sample| self.train_sample(sample, &mut changes))
                .sum();
            error = total / samples.len() as f64;

            if options.log_enabled && options.log_period > 0 && iterations % options.log_period == 0
            {
                info!(iterations, error, "training progress");
            }
        }

        if !error.is_finite() {
            warn!(iterations, error, "training diverged");
        } else if error > options.error_threshold {
            warn!(
                iterations,
                error,
                threshold = options.error_threshold,
                "training stopped at the iteration cap"
            );
        } else {
            info!(iterations, error, "training converged");
        }

        TrainingResult { iterations, error }
    }

    fn run(&self, input: &[f64]) -> Vec<f64> {
        debug_assert_eq!(input.len(), self.input_size());
        self.layers
            .iter()
            .fold(input.to_vec(), |acc, layer| layer.activate(&acc))
    }

    fn serialize(&self) -> Model {
        Model {
            version: MODEL_VERSION,
            sizes: self.sizes.clone(),
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            layers: self.layers.clone(),
            training: None,
        }
    }

    /// Rejects models with inconsistent shapes.
    fn deserialize(model: Model) -> Result<FeedForward, String> {
        model.validate()?;
        Ok(FeedForward {
            sizes: model.sizes,
            layers: model.layers,
            learning_rate: model.learning_rate,
            momentum: model.momentum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::rules::{ChessRules, StandardRules, START_FEN};
    use crate::nn::encoding::encode_position;
    use crate::training::build_sample;

    fn seeded(seed: u64) -> FeedForward {
        FeedForward::new(&NetworkConfig {
            seed,
            ..NetworkConfig::default()
        })
    }

    fn sample(fen: &str, raw: f64) -> TrainingSample {
        let position = StandardRules.parse(fen).unwrap();
        build_sample(&position, raw).unwrap()
    }

    #[test]
    fn default_shape() {
        let net = seeded(7);
        assert_eq!(net.sizes(), &[FEATURE_LEN, 128, 64, 1]);
        assert_eq!(net.input_size(), FEATURE_LEN);
        assert_eq!(net.output_size(), 1);
        assert_eq!(net.layers[0].weights.len(), 128);
        assert_eq!(net.layers[0].weights[0].len(), FEATURE_LEN);
        assert_eq!(net.layers[2].biases.len(), 1);
    }

    #[test]
    fn initial_weights_in_range() {
        let net = seeded(11);
        for layer in &net.layers {
            for w in layer.weights.iter().flatten().chain(&layer.biases) {
                assert!((-INIT_RANGE..INIT_RANGE).contains(w), "weight {} out of range", w);
            }
        }
    }

    #[test]
    fn same_seed_same_network() {
        assert_eq!(seeded(42), seeded(42));
        assert_ne!(seeded(42), seeded(43));
    }

    #[test]
    fn run_output_in_unit_interval() {
        let net = seeded(3);
        let position = StandardRules.parse(START_FEN).unwrap();
        let out = net.run(&encode_position(&position));
        assert_eq!(out.len(), 1);
        assert!((0.0..=1.0).contains(&out[0]));
        // Running does not change parameters.
        let before = net.clone();
        let _ = net.run(&encode_position(&position));
        assert_eq!(net, before);
    }

    #[test]
    fn training_reduces_error() {
        let mut net = FeedForward::new(&NetworkConfig {
            hidden_layers: vec![8],
            learning_rate: 0.3,
            seed: 5,
            ..NetworkConfig::default()
        });
        let separable = |sign: f64, target: f64| {
            let mut input = [0.0; FEATURE_LEN];
            input[0] = 5.0 * sign;
            input[64] = sign;
            TrainingSample { input, target }
        };
        let samples = vec![separable(1.0, 0.9), separable(-1.0, 0.1)];

        let quiet = TrainingOptions {
            log_enabled: false,
            ..TrainingOptions::default()
        };
        let first = net.train(
            &samples,
            &TrainingOptions {
                iterations: 1,
                ..quiet
            },
        );
        let later = net.train(
            &samples,
            &TrainingOptions {
                iterations: 1000,
                ..quiet
            },
        );
        assert_eq!(first.iterations, 1);
        assert!(later.iterations <= 1000);
        assert!(
            later.error < first.error / 2.0,
            "error did not drop: {} -> {}",
            first.error,
            later.error
        );
    }

    #[test]
    fn training_stops_at_threshold() {
        let mut net = seeded(9);
        let samples = vec![sample(START_FEN, 0.0)];
        let result = net.train(
            &samples,
            &TrainingOptions {
                iterations: 10_000,
                error_threshold: 0.01,
                log_enabled: false,
                log_period: 1,
            },
        );
        assert!(result.error <= 0.01);
        assert!(result.iterations < 10_000);
    }

    #[test]
    fn nan_learning_rate_diverges() {
        let mut net = FeedForward::new(&NetworkConfig {
            hidden_layers: vec![4],
            learning_rate: f64::NAN,
            seed: 2,
            ..NetworkConfig::default()
        });
        let samples = vec![sample(START_FEN, 0.0), sample(START_FEN, 1.0)];
        let result = net.train(
            &samples,
            &TrainingOptions {
                iterations: 10,
                log_enabled: false,
                ..TrainingOptions::default()
            },
        );
        assert!(result.diverged());
    }

    #[test]
    fn config_validation() {
        assert!(NetworkConfig::default().validate().is_ok());
        assert!(TrainingOptions::default().validate().is_ok());
        for learning_rate in [f64::NAN, f64::INFINITY, 0.0, -0.1] {
            let config = NetworkConfig {
                learning_rate,
                ..NetworkConfig::default()
            };
            assert!(config.validate().is_err(), "accepted rate {}", learning_rate);
        }
        let config = NetworkConfig {
            momentum: f64::NAN,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());
        let config = NetworkConfig {
            hidden_layers: vec![16, 0],
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());
        let options = TrainingOptions {
            error_threshold: f64::NAN,
            ..TrainingOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn empty_training_set_is_a_no_op() {
        let mut net = seeded(1);
        let before = net.clone();
        let result = net.train(&[], &TrainingOptions::default());
        assert_eq!(result.iterations, 0);
        assert_eq!(net, before);
    }
}
