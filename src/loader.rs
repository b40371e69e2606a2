//! Turning raw puzzle text into a list of givens (§3.2, §6).
//!
//! Only the block/token format is implemented: it is the minimal runnable
//! collaborator for the `Loader` seam. The richer Sadman Sudoku file format
//! stays an interface only, same as a puzzle fetched over the network would
//! — nothing here assumes `TokenLoader` is the only implementation.

use std::fmt::Display;

use thiserror::Error;

use crate::coord::{Coord3, Magnitude};

/// One filled-in cell read from a loader: `z` is already zero-based.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Given {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

#[derive(Debug, Error, Clone)]
pub enum LoaderError {
    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("row {row}: expected {expected} cells, found {found}")]
    RowLength { row: usize, expected: usize, found: usize },
    #[error("row {row}, cell {col}: '{token}' is not a recognized value")]
    InvalidToken { row: usize, col: usize, token: String },
    #[error("row {row}, cell {col}: value {value} is out of range 1..={max}")]
    OutOfRange { row: usize, col: usize, value: usize, max: usize },
    #[error("{unit} already has {value} at {other}; cell ({x}, {y}) cannot repeat it")]
    DuplicateValue {
        unit: &'static str,
        value: usize,
        x: usize,
        y: usize,
        other: String,
    },
}

/// A source of givens for a puzzle of a particular [`Magnitude`].
pub trait Loader {
    fn load(&self, magnitude: Magnitude) -> Result<Vec<Given>, LoaderError>;
}

/// Reads a grid written either one character per cell ("block" format, no
/// separators — only usable up to magnitude 3, since values above 9 need
/// more than one character) or whitespace-separated tokens ("token" format,
/// any magnitude). `.` and `0` both mean "blank". Blank lines and lines
/// starting with `#` are ignored, the same tolerance the teacher's
/// `SolverCommand::parse` gives its own input.
pub struct TokenLoader {
    text: String,
}

impl TokenLoader {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn parse_value(token: &str, row: usize, col: usize) -> Result<Option<usize>, LoaderError> {
        if token == "." || token == "0" {
            return Ok(None);
        }
        if let Ok(n) = token.parse::<usize>() {
            return Ok(Some(n));
        }
        if token.len() == 1 {
            let c = token.chars().next().unwrap();
            if c.is_ascii_alphabetic() {
                let base = if c.is_ascii_lowercase() { b'a' } else { b'A' };
                return Ok(Some((c as u8 - base) as usize + 10));
            }
        }
        Err(LoaderError::InvalidToken {
            row,
            col,
            token: token.to_string(),
        })
    }

    fn tokenize(line: &str) -> Vec<String> {
        if line.chars().any(|c| c.is_whitespace()) {
            line.split_whitespace().map(str::to_string).collect()
        } else {
            line.chars().map(|c| c.to_string()).collect()
        }
    }

    /// Rejects a given whose value already appears elsewhere in its row,
    /// column or box (§7 "initial duplicate"). Checked after parsing so the
    /// error can name both the new cell and the one it collides with.
    fn check_duplicates(givens: &[Given], magnitude: Magnitude) -> Result<(), LoaderError> {
        let m = magnitude.m();
        let mut by_row: std::collections::HashMap<(usize, usize), Given> = std::collections::HashMap::new();
        let mut by_col: std::collections::HashMap<(usize, usize), Given> = std::collections::HashMap::new();
        let mut by_box: std::collections::HashMap<(usize, usize, usize), Given> = std::collections::HashMap::new();

        for &given in givens {
            let (bx, by) = Coord3::new(given.x, given.y, given.z).box_coord(m);

            if let Some(other) = by_row.insert((given.y, given.z), given) {
                return Err(LoaderError::DuplicateValue {
                    unit: "row",
                    value: given.z + 1,
                    x: given.x,
                    y: given.y,
                    other: other.to_string(),
                });
            }
            if let Some(other) = by_col.insert((given.x, given.z), given) {
                return Err(LoaderError::DuplicateValue {
                    unit: "column",
                    value: given.z + 1,
                    x: given.x,
                    y: given.y,
                    other: other.to_string(),
                });
            }
            if let Some(other) = by_box.insert((bx, by, given.z), given) {
                return Err(LoaderError::DuplicateValue {
                    unit: "box",
                    value: given.z + 1,
                    x: given.x,
                    y: given.y,
                    other: other.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Loader for TokenLoader {
    fn load(&self, magnitude: Magnitude) -> Result<Vec<Given>, LoaderError> {
        let n = magnitude.n();
        let rows: Vec<&str> = self
            .text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        if rows.len() != n {
            return Err(LoaderError::RowCount {
                expected: n,
                found: rows.len(),
            });
        }

        let mut givens = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            let tokens = Self::tokenize(row);
            if tokens.len() != n {
                return Err(LoaderError::RowLength {
                    row: y,
                    expected: n,
                    found: tokens.len(),
                });
            }
            for (x, token) in tokens.iter().enumerate() {
                if let Some(value) = Self::parse_value(token, y, x)? {
                    if value == 0 || value > n {
                        return Err(LoaderError::OutOfRange {
                            row: y,
                            col: x,
                            value,
                            max: n,
                        });
                    }
                    givens.push(Given { x, y, z: value - 1 });
                }
            }
        }
        Self::check_duplicates(&givens, magnitude)?;
        Ok(givens)
    }
}

impl Display for Given {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) = {}", self.x, self.y, self.z + 1)
    }
}
