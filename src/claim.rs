//! The claim side of the bipartite claim/fact graph (§3.1, §4.1).

use std::fmt::Display;

use thiserror::Error;

use crate::coord::Coord3;
use crate::fact::FactId;
use crate::universe::UniverseItem;

/// A stable index into a [`crate::puzzle::Puzzle`]'s claim arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClaimId(pub(crate) usize);

impl UniverseItem for ClaimId {
    fn from_index(index: usize) -> Self {
        ClaimId(index)
    }
    fn index(&self) -> usize {
        self.0
    }
}

impl Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// The terminal-or-not state of a claim (§3.1). Once a claim leaves `Active`
/// it never returns — see `ClaimRecord::set_state`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClaimState {
    Active,
    True,
    False,
}

impl Display for ClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimState::Active => write!(f, "active"),
            ClaimState::True => write!(f, "true"),
            ClaimState::False => write!(f, "false"),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStateError {
    #[error("claim {claim} was already asserted false, cannot assert it true")]
    AlreadyFalse { claim: ClaimId },
    #[error("claim {claim} was already asserted true, cannot assert it false")]
    AlreadyTrue { claim: ClaimId },
}

/// One claim: "cell (x, y) takes value z". `facts` is the fixed set of the
/// four standard facts this claim belongs to (cell, row, column, box) — it
/// never changes, because claims are never added to or removed from a
/// fact's static neighborhood; only a *fact*'s `members` bitset shrinks
/// (see `fact.rs`). An init-fact, when one exists for this claim, is
/// tracked separately and is not part of this array (§3.1).
#[derive(Clone, Debug)]
pub struct ClaimRecord {
    pub coord: Coord3,
    pub facts: [FactId; 4],
    state: ClaimState,
}

impl ClaimRecord {
    pub fn new(coord: Coord3, facts: [FactId; 4]) -> Self {
        Self {
            coord,
            facts,
            state: ClaimState::Active,
        }
    }

    pub fn state(&self) -> ClaimState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ClaimState::Active
    }

    /// Drives the claim to `target`. Re-entrant-safe: setting a claim to the
    /// state it is already in is a no-op that reports "nothing changed";
    /// setting it to the opposite terminal state is a contradiction (§4.1).
    pub(crate) fn set_state(
        &mut self,
        id: ClaimId,
        target: ClaimState,
    ) -> Result<bool, ClaimStateError> {
        if self.state == target {
            return Ok(false);
        }
        match (self.state, target) {
            (ClaimState::True, ClaimState::False) => Err(ClaimStateError::AlreadyTrue { claim: id }),
            (ClaimState::False, ClaimState::True) => Err(ClaimStateError::AlreadyFalse { claim: id }),
            _ => {
                self.state = target;
                Ok(true)
            }
        }
    }
}
