//! Property tests for encoding, target normalization, and score range.

use proptest::prelude::*;
use proptest::sample::Index;

use chessnet::board::rules::{ChessRules, StandardRules, START_FEN};
use chessnet::eval::{evaluate, rescale_output};
use chessnet::nn::encoding::{encode_position, CASTLING_OFFSET, FEATURE_LEN, SIDE_TO_MOVE_INDEX};
use chessnet::nn::{TrainableFunction, TrainingOptions, TrainingResult};
use chessnet::training::{build_sample, denormalize_target, normalize_target, TrainingSample};

const SQUARE_VALUES: [f64; 11] = [
    0.0, 1.0, -1.0, 3.0, -3.0, 5.0, -5.0, 9.0, -9.0, 100.0, -100.0,
];

/// A function that ignores its input.
struct Fixed(f64);

impl TrainableFunction for Fixed {
    type State = f64;

    fn train(&mut self, _: &[TrainingSample], _: &TrainingOptions) -> TrainingResult {
        TrainingResult {
            iterations: 0,
            error: 0.0,
        }
    }

    fn run(&self, _: &[f64]) -> Vec<f64> {
        vec![self.0]
    }

    fn serialize(&self) -> f64 {
        self.0
    }

    fn deserialize(state: f64) -> Result<Self, String> {
        Ok(Fixed(state))
    }
}

/// Plays moves chosen by `picks` from the start position, stopping early
/// if the game ends.
fn playout(picks: &[Index]) -> Vec<chess::Board> {
    let rules = StandardRules;
    let mut position = rules.parse(START_FEN).unwrap();
    let mut history = vec![position];
    for pick in picks {
        let moves = rules.legal_moves(&position);
        if moves.is_empty() {
            break;
        }
        position = rules.apply_move(&position, pick.get(&moves).as_str()).unwrap();
        history.push(position);
    }
    history
}

proptest! {
    #[test]
    fn normalization_roundtrips(raw in -10.0f64..=10.0) {
        let normalized = normalize_target(raw);
        prop_assert!((0.0..=1.0).contains(&normalized));
        prop_assert!((denormalize_target(normalized) - raw).abs() < 1e-9);
    }

    #[test]
    fn normalization_is_monotonic(a in -10.0f64..=10.0, b in -10.0f64..=10.0) {
        if a < b {
            prop_assert!(normalize_target(a) <= normalize_target(b));
        }
    }

    #[test]
    fn score_stays_in_range(raw in 0.0f64..=1.0) {
        let board = StandardRules.parse(START_FEN).unwrap();
        let score = evaluate(&board, &Fixed(raw));
        prop_assert!((-1.0..=1.0).contains(&score));
        prop_assert!((score - (raw * 2.0 - 1.0)).abs() < 1e-12);
        prop_assert_eq!(score, rescale_output(raw));
    }

    #[test]
    fn playout_encodings_are_well_formed(picks in prop::collection::vec(any::<Index>(), 0..60)) {
        let history = playout(&picks);
        let mut previous_castling = [1.0; 4];

        for (ply, position) in history.iter().enumerate() {
            let features = encode_position(position);
            prop_assert_eq!(features.len(), FEATURE_LEN);

            for value in &features[..SIDE_TO_MOVE_INDEX] {
                prop_assert!(SQUARE_VALUES.contains(value), "unexpected square value {}", value);
            }
            prop_assert_eq!(features[..64].iter().filter(|v| **v == 100.0).count(), 1);
            prop_assert_eq!(features[..64].iter().filter(|v| **v == -100.0).count(), 1);

            let expected_side = if ply % 2 == 0 { 1.0 } else { -1.0 };
            prop_assert_eq!(features[SIDE_TO_MOVE_INDEX], expected_side);

            // Castling rights are 0 or 1 and can only be lost.
            for i in 0..4 {
                let flag = features[CASTLING_OFFSET + i];
                prop_assert!(flag == 0.0 || flag == 1.0);
                prop_assert!(flag <= previous_castling[i]);
                previous_castling[i] = flag;
            }

            prop_assert_eq!(encode_position(position), features);
        }
    }

    #[test]
    fn samples_keep_the_encoding(picks in prop::collection::vec(any::<Index>(), 0..20), raw in -10.0f64..=10.0) {
        let history = playout(&picks);
        let position = history.last().unwrap();
        let sample = build_sample(position, raw).unwrap();
        prop_assert_eq!(sample.input, encode_position(position));
        prop_assert_eq!(sample.target, normalize_target(raw));
    }
}
