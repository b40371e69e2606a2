pub mod claim;
pub mod colorchain;
pub mod config;
pub mod coord;
pub mod driver;
pub mod event;
pub mod fact;
pub mod initializer;
pub mod loader;
pub mod observer;
pub mod puzzle;
pub mod sledgehammer;
pub mod universe;
pub mod whatif;

use std::io::{self, Read};

use crate::config::Config;
use crate::coord::Magnitude;
use crate::driver::{solve, DriverError, SolveOutcome};
use crate::loader::TokenLoader;
use crate::observer::TraceObserver;

/// A puzzle's row count determines its magnitude: N rows of N cells, N = m².
fn infer_magnitude(text: &str) -> Option<Magnitude> {
    let rows = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .count();
    let m = (rows as f64).sqrt().round() as usize;
    (m * m == rows && m > 0).then(|| Magnitude::new(m))
}

fn print_grid(puzzle: &puzzle::Puzzle, magnitude: Magnitude) {
    let n = magnitude.n();
    for y in 0..n {
        let row: Vec<String> = (0..n)
            .map(|x| {
                puzzle
                    .true_value_at(x, y)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| ".".to_string())
            })
            .collect();
        println!("{}", row.join(" "));
    }
}

fn main() {
    env_logger::init();

    let mut text = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut text) {
        eprintln!("could not read puzzle from stdin: {err}");
        std::process::exit(1);
    }

    let magnitude = match infer_magnitude(&text) {
        Some(m) => m,
        None => {
            eprintln!("could not infer a puzzle magnitude from the input's row count");
            std::process::exit(1);
        }
    };

    let loader = TokenLoader::new(text);
    let config = Config::from_env();
    let mut observer = TraceObserver;

    match solve(magnitude, &loader, &config, &(), &mut observer) {
        Ok(report) => {
            print_grid(&report.puzzle, magnitude);
            match report.outcome {
                SolveOutcome::Solved => println!("solved in {} event(s)", report.events.len()),
                SolveOutcome::StuckButConsistent => {
                    println!("stuck but consistent after {} event(s)", report.events.len())
                }
            }
        }
        Err(DriverError::Initializer(err)) => {
            eprintln!("could not load puzzle: {err}");
            std::process::exit(1);
        }
        Err(DriverError::Contradiction(err)) => {
            eprintln!("puzzle is contradictory: {err}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("solve failed: {err}");
            std::process::exit(1);
        }
    }
}
