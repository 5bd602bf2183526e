//! chessnet command line.
//!
//! Usage:
//!   chessnet train [OPTIONS]
//!   chessnet test [OPTIONS]
//!   chessnet evaluate [FEN] [--moves M...] [OPTIONS]
//!   chessnet evaluate --file FILE [OPTIONS]
//!   chessnet help
//!
//! Results go to stdout; logs go to stderr.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use tracing::Level;

use chessnet::board::rules::{ChessRules, LenientRules, StandardRules, START_FEN};
use chessnet::board::PositionView;
use chessnet::eval::Evaluator;
use chessnet::nn::DEFAULT_MODEL_PATH;
use chessnet::suite::{self, Suite};
use chessnet::training::{self, TrainConfig};

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return;
    };

    let rest = &args[1..];
    match command.as_str() {
        "train" => train(rest),
        "test" => test(rest),
        "evaluate" => evaluate(rest),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            process::exit(1);
        }
    }
}

fn init_logging(quiet: bool) {
    let level = if quiet { Level::WARN } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Prints an error and exits with status 1.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

/// Returns the value following a flag, parsed.
fn flag_value<T: FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    *i += 1;
    match args.get(*i).map(|v| v.parse()) {
        Some(Ok(value)) => value,
        _ => {
            eprintln!("invalid {} value", flag);
            print_usage();
            process::exit(1);
        }
    }
}

fn unknown_argument(arg: &str) -> ! {
    eprintln!("Unknown argument: {}", arg);
    print_usage();
    process::exit(1);
}

fn train(args: &[String]) {
    let mut config = TrainConfig::default();
    let mut quiet = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--model" => config.model_path = flag_value(args, &mut i, "--model"),
            "--curriculum" => {
                config.curriculum_path = Some(flag_value(args, &mut i, "--curriculum"))
            }
            "--iterations" => config.options.iterations = flag_value(args, &mut i, "--iterations"),
            "--error-threshold" => {
                config.options.error_threshold = flag_value(args, &mut i, "--error-threshold")
            }
            "--learning-rate" => {
                config.network.learning_rate = flag_value(args, &mut i, "--learning-rate")
            }
            "--log-period" => config.options.log_period = flag_value(args, &mut i, "--log-period"),
            "--seed" => config.network.seed = flag_value(args, &mut i, "--seed"),
            "--quiet" => quiet = true,
            other => unknown_argument(other),
        }
        i += 1;
    }

    init_logging(quiet);
    config.options.log_enabled = !quiet;

    let outcome = training::train_model(&StandardRules, &config).unwrap_or_else(|e| fail(e));
    println!(
        "Trained on {} samples: {} iterations, error {:.6}",
        outcome.sample_count, outcome.result.iterations, outcome.result.error
    );
    println!("Model saved to {}", config.model_path.display());
}

fn test(args: &[String]) {
    let mut model_path = PathBuf::from(DEFAULT_MODEL_PATH);
    let mut suite_path: Option<PathBuf> = None;
    let mut quiet = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--model" => model_path = flag_value(args, &mut i, "--model"),
            "--suite" => suite_path = Some(flag_value(args, &mut i, "--suite")),
            "--quiet" => quiet = true,
            other => unknown_argument(other),
        }
        i += 1;
    }

    init_logging(quiet);

    let suite = match &suite_path {
        Some(path) => suite::load_suite(path).unwrap_or_else(|e| fail(e)),
        None => Suite::default_set(),
    };
    let evaluator = Evaluator::load(&model_path).unwrap_or_else(|e| fail(e));
    let report = suite::run_suite(&StandardRules, &evaluator, &suite).unwrap_or_else(|e| fail(e));

    for case in &report.cases {
        println!(
            "{:<36} expected {:+.2}  score {:+.3}  error {:.3}",
            case.description, case.expected, case.score, case.abs_error
        );
    }
    println!(
        "Mean absolute error over {} positions: {:.3}",
        report.cases.len(),
        report.mean_abs_error
    );
}

fn evaluate(args: &[String]) {
    let mut model_path = PathBuf::from(DEFAULT_MODEL_PATH);
    let mut batch_path: Option<PathBuf> = None;
    let mut fen_parts: Vec<&str> = Vec::new();
    let mut moves: Vec<&str> = Vec::new();
    let mut quiet = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--model" => model_path = flag_value(args, &mut i, "--model"),
            "--file" => batch_path = Some(flag_value(args, &mut i, "--file")),
            "--moves" => {
                while i + 1 < args.len() && !args[i + 1].starts_with("--") {
                    i += 1;
                    moves.push(&args[i]);
                }
            }
            "--quiet" => quiet = true,
            flag if flag.starts_with("--") => unknown_argument(flag),
            // Accept the FEN either quoted or split across arguments.
            part => fen_parts.push(part),
        }
        i += 1;
    }

    init_logging(quiet);

    if let Some(path) = batch_path {
        if !fen_parts.is_empty() || !moves.is_empty() {
            fail("--file cannot be combined with a FEN or --moves");
        }
        return evaluate_file(&path, &model_path);
    }

    let fen = if fen_parts.is_empty() {
        START_FEN.to_string()
    } else {
        fen_parts.join(" ")
    };

    let rules = LenientRules;
    let mut position = rules.parse(&fen).unwrap_or_else(|e| fail(e));
    for mv in &moves {
        position = rules.apply_move(&position, mv).unwrap_or_else(|e| fail(e));
    }
    let evaluator = Evaluator::load(&model_path).unwrap_or_else(|e| fail(e));
    let score = evaluator.evaluate(&position).unwrap_or_else(|e| fail(e));

    if !moves.is_empty() {
        println!("Moves: {}", moves.join(" "));
    }
    println!("Position: {}", rules.serialize(&position));
    println!("Score: {:.3}", score);
    println!("Side to move: {:?}", position.side_to_move());
    println!("Positive scores favor white, negative scores favor black.");
}

/// Scores every FEN in a file, one per line. Blank lines and lines starting
/// with `#` are skipped.
fn evaluate_file(path: &Path, model_path: &Path) {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("failed to read {}: {}", path.display(), e)));
    let fens: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    let rules = LenientRules;
    let positions: Vec<_> = fens
        .iter()
        .map(|fen| rules.parse(fen).unwrap_or_else(|e| fail(e)))
        .collect();
    let evaluator = Evaluator::load(model_path).unwrap_or_else(|e| fail(e));
    let scores = evaluator
        .evaluate_batch(&positions)
        .unwrap_or_else(|e| fail(e));

    for (position, score) in positions.iter().zip(&scores) {
        println!("{:+.3}  {}", score, rules.serialize(position));
    }
}

fn print_usage() {
    eprintln!("Usage: chessnet <COMMAND> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  train            Train a model on the curriculum and save it");
    eprintln!("  test             Score the reference positions with a trained model");
    eprintln!("  evaluate [FEN]   Score one position (default: starting position)");
    eprintln!("  evaluate --file FILE");
    eprintln!("                   Score every FEN in FILE, one per line");
    eprintln!("  help             Show this help");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --model FILE            Model file (default: {})", DEFAULT_MODEL_PATH);
    eprintln!("  --curriculum FILE       Training curriculum JSON (train; default: bundled)");
    eprintln!("  --suite FILE            Reference suite JSON (test; default: bundled)");
    eprintln!("  --moves M...            Moves to play before scoring, UCI or SAN (evaluate)");
    eprintln!("  --iterations N          Maximum training iterations (default: 20000)");
    eprintln!("  --error-threshold X     Stop once training error falls below X (default: 0.005)");
    eprintln!("  --learning-rate X       Learning rate (default: 0.1)");
    eprintln!("  --log-period N          Log every N iterations (default: 1000)");
    eprintln!("  --seed N                Weight init seed, 0 for entropy (default: 0)");
    eprintln!("  --quiet                 Only log warnings");
}
