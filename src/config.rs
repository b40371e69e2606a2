//! Tiny environment-driven configuration (§2): how deep the what-if engine
//! is allowed to nest, read once at startup rather than threaded through
//! every call.

use std::env;

const WHATIF_DEPTH_VAR: &str = "SUDOKU_WHATIF_DEPTH";
const DEFAULT_WHATIF_DEPTH: usize = 2;

#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub whatif_depth: usize,
}

impl Config {
    /// Reads `SUDOKU_WHATIF_DEPTH` from the environment, falling back to a
    /// default when it is unset or unparseable. `RUST_LOG` is read directly
    /// by `env_logger::init()` in `main` and has no field here.
    pub fn from_env() -> Self {
        Self {
            whatif_depth: parse_depth(env::var(WHATIF_DEPTH_VAR).ok()),
        }
    }
}

fn parse_depth(raw: Option<String>) -> usize {
    raw.and_then(|value| value.parse().ok()).unwrap_or(DEFAULT_WHATIF_DEPTH)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whatif_depth: DEFAULT_WHATIF_DEPTH,
        }
    }
}
