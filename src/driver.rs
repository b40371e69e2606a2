//! The solver driver (§4.6): load, initialize, run the cheap techniques to a
//! fixed point, escalate to what-if when they stall, and stop as soon as one
//! of solved / stuck-but-consistent / contradiction is reached.

use log::info;
use thiserror::Error;

use crate::config::Config;
use crate::coord::{FactKey, Magnitude};
use crate::event::{EventId, EventTree};
use crate::initializer::{self, InitializerError};
use crate::loader::Loader;
use crate::observer::Observer;
use crate::puzzle::{Contradiction, Puzzle};
use crate::{colorchain, sledgehammer, whatif};

/// How many source facts the sledgehammer search is allowed to grow a group
/// to before giving up on a seed: half the puzzle's side length, matching
/// the search strategy's own termination rule "for k = 3, 4, …, N … at
/// k = N/2 return no-progress" (§4.2).
fn sledgehammer_max_size(puzzle: &Puzzle) -> usize {
    puzzle.magnitude().n() / 2
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Initializer(#[from] InitializerError),
    #[error(transparent)]
    Contradiction(#[from] Contradiction),
    #[error("solve cancelled")]
    Cancelled,
    #[error("fact {fact} claims to be solved but still has {remaining} candidate(s)")]
    NoUnaccountedClaims { fact: FactKey, remaining: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolveOutcome {
    Solved,
    StuckButConsistent,
}

pub struct SolveReport {
    pub puzzle: Puzzle,
    pub events: EventTree,
    pub outcome: SolveOutcome,
}

/// Polled between technique applications. `solve` checks it instead of
/// spawning its own thread — cancellation is cooperative, driven by
/// whatever embeds this crate (a UI event loop, a timeout wrapper).
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

impl Cancellation for () {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Runs the cheap, non-hypothetical techniques to a fixed point: sledgehammer
/// (which subsumes singles/pairs/triples and the fish family) then
/// color-chain, looping back to sledgehammer after every color-chain move
/// since it can expose new subset covers. Matches the `whatif::Propagate`
/// signature so the what-if engine can call back into it from inside a
/// branch.
pub fn propagate(puzzle: &mut Puzzle, events: &mut EventTree, parent: EventId) -> Result<(), Contradiction> {
    loop {
        if sledgehammer::apply_one(puzzle, events, parent, sledgehammer_max_size(puzzle))?.is_some() {
            continue;
        }
        if colorchain::apply_one(puzzle, events, parent)?.is_some() {
            continue;
        }
        break;
    }
    Ok(())
}

/// Notifies `observer` of every child of `root` inserted since the last call
/// — the top-level events the driver records (§4.5, §6), regardless of
/// which technique produced them. Returns the new total so the caller can
/// pick up where it left off.
fn notify_new_top_level(events: &EventTree, root: EventId, already_observed: usize, observer: &mut dyn Observer) -> usize {
    let children = events.children_of(root);
    for &id in &children[already_observed..] {
        observer.observe(&events[id]);
    }
    children.len()
}

fn verify_solved(puzzle: &Puzzle) -> Result<(), DriverError> {
    for fact in puzzle.facts() {
        if fact.key.species() == crate::coord::Species::Init {
            continue;
        }
        if fact.size() != 1 {
            return Err(DriverError::NoUnaccountedClaims {
                fact: fact.key,
                remaining: fact.size(),
            });
        }
    }
    Ok(())
}

/// Loads, solves and verifies one puzzle of the given magnitude.
pub fn solve(
    magnitude: Magnitude,
    loader: &dyn Loader,
    config: &Config,
    cancellation: &dyn Cancellation,
    observer: &mut dyn Observer,
) -> Result<SolveReport, DriverError> {
    let mut puzzle = Puzzle::new(magnitude);
    let (mut events, root) = EventTree::new();
    let mut observed = 0;

    initializer::initialize(&mut puzzle, loader, &mut events, root)?;
    observed = notify_new_top_level(&events, root, observed, observer);
    propagate(&mut puzzle, &mut events, root)?;
    observed = notify_new_top_level(&events, root, observed, observer);

    while !puzzle.is_fully_decided() {
        if cancellation.is_cancelled() {
            return Err(DriverError::Cancelled);
        }
        match whatif::explore_depth(&mut puzzle, &mut events, root, config.whatif_depth, propagate)? {
            Some(_) => {
                observed = notify_new_top_level(&events, root, observed, observer);
                propagate(&mut puzzle, &mut events, root)?;
                observed = notify_new_top_level(&events, root, observed, observer);
            }
            None => break,
        }
    }

    let outcome = if puzzle.is_fully_decided() {
        verify_solved(&puzzle)?;
        info!("solved after {} event(s)", events.len());
        SolveOutcome::Solved
    } else {
        info!("stuck but consistent after {} event(s)", events.len());
        SolveOutcome::StuckButConsistent
    };

    Ok(SolveReport { puzzle, events, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimState;
    use crate::loader::{LoaderError, TokenLoader};
    use crate::observer::NullObserver;
    use crate::universe::BackedSet;

    #[test]
    fn solves_a_fully_determined_4x4() {
        let loader = TokenLoader::new("1 2 . .\n. . 1 2\n2 1 . .\n. . 2 1");
        let config = Config::default();
        let report = solve(Magnitude::new(2), &loader, &config, &(), &mut NullObserver).expect("should solve");
        assert_eq!(report.outcome, SolveOutcome::Solved);
    }

    #[test]
    fn rejects_duplicate_givens_at_the_loader() {
        // Two givens in the same cell's row claim the same digit — the
        // loader itself catches this before a puzzle is even built.
        let loader = TokenLoader::new("1 1 . .\n. . 1 2\n2 1 . .\n. . 2 1");
        let config = Config::default();
        let err = solve(Magnitude::new(2), &loader, &config, &(), &mut NullObserver).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Initializer(InitializerError::Loader(LoaderError::DuplicateValue { .. }))
        ));
    }

    #[test]
    fn a_given_falsifies_every_conflicting_claim_in_its_cell_row_column_and_box() {
        // cell (0,0)'s other 8 values, row 0's other 8 cells, column 0's
        // other 8 cells, and the 4 cells box (0,0) has in neither that row
        // nor that column: 8 + 8 + 8 + 4 = 28 claims falsified by one given.
        let mut puzzle = Puzzle::new(Magnitude::new(3));
        let (mut events, root) = EventTree::new();
        puzzle.assert_given(0, 0, 0, &mut events, root).expect("consistent given");

        let active = puzzle.active_claims().count();
        assert_eq!(active, puzzle.claim_universe().len() - 1 - 28);
        assert_eq!(puzzle.claim(puzzle.claim_at(1, 1, 0)).state(), ClaimState::False); // box, neither row nor column
        assert_eq!(puzzle.claim(puzzle.claim_at(5, 0, 0)).state(), ClaimState::False); // row
        assert_eq!(puzzle.claim(puzzle.claim_at(0, 5, 0)).state(), ClaimState::False); // column
        assert_eq!(puzzle.claim(puzzle.claim_at(0, 0, 5)).state(), ClaimState::False); // cell
    }

    #[test]
    fn a_naked_pair_eliminates_the_rest_of_its_shared_box() {
        // (0,0) and (1,0) are each narrowed to exactly values 4 and 6; both
        // cells sit in box (0,0), so narrowing the row down to that same
        // pair makes it a subset of the box, and the box's other 7 cells
        // lose both values as soon as the narrowing reaches fixed point.
        let mut puzzle = Puzzle::new(Magnitude::new(3));
        let (mut events, root) = EventTree::new();
        let n = puzzle.claim_universe().len();

        let a3 = puzzle.claim_at(0, 0, 3);
        let a5 = puzzle.claim_at(0, 0, 5);
        let b3 = puzzle.claim_at(1, 0, 3);
        let b5 = puzzle.claim_at(1, 0, 5);

        for (fact, keep) in [
            (puzzle.cell_fact(0, 0), [a3, a5]),
            (puzzle.cell_fact(1, 0), [b3, b5]),
            (puzzle.row_fact(0, 3), [a3, b3]),
            (puzzle.row_fact(0, 5), [a5, b5]),
        ] {
            let eliminate = puzzle.fact(fact).members.difference(&BackedSet::from_items(n, keep));
            puzzle
                .force_false(&eliminate, &mut events, root, "test setup")
                .expect("consistent setup");
        }

        for (x, y) in [(2, 0), (0, 1), (1, 1), (2, 1), (0, 2), (1, 2), (2, 2)] {
            assert_eq!(puzzle.claim(puzzle.claim_at(x, y, 3)).state(), ClaimState::False);
            assert_eq!(puzzle.claim(puzzle.claim_at(x, y, 5)).state(), ClaimState::False);
        }
    }

    #[test]
    fn a_rectangle_of_two_rows_and_two_columns_eliminates_the_rest_of_two_boxes() {
        // Value 1 is narrowed to x in {0, 1} in both row 0 and row 4, and
        // to y in {0, 4} in both column 0 and column 1 — the four corner
        // claims form one xor cycle. (0,0)/(1,0) share box (0,0) and
        // (1,4)/(0,4) share box (0,1), so each row narrowing is already a
        // subset of its box and the rest of both boxes loses value 1 too.
        let mut puzzle = Puzzle::new(Magnitude::new(3));
        let (mut events, root) = EventTree::new();
        let n = puzzle.claim_universe().len();

        let c00 = puzzle.claim_at(0, 0, 0);
        let c10 = puzzle.claim_at(1, 0, 0);
        let c14 = puzzle.claim_at(1, 4, 0);
        let c04 = puzzle.claim_at(0, 4, 0);

        for (fact, keep) in [
            (puzzle.row_fact(0, 0), [c00, c10]),
            (puzzle.col_fact(1, 0), [c10, c14]),
            (puzzle.row_fact(4, 0), [c14, c04]),
            (puzzle.col_fact(0, 0), [c00, c04]),
        ] {
            let eliminate = puzzle.fact(fact).members.difference(&BackedSet::from_items(n, keep));
            puzzle
                .force_false(&eliminate, &mut events, root, "test setup")
                .expect("consistent setup");
        }

        assert_eq!(puzzle.claim(puzzle.claim_at(2, 0, 0)).state(), ClaimState::False);
        assert_eq!(puzzle.claim(puzzle.claim_at(1, 1, 0)).state(), ClaimState::False);
        assert_eq!(puzzle.claim(puzzle.claim_at(2, 3, 0)).state(), ClaimState::False);
        assert_eq!(puzzle.claim(puzzle.claim_at(0, 5, 0)).state(), ClaimState::False);
    }

    #[test]
    fn a_conjugate_pair_sharing_a_box_eliminates_the_rest_of_that_box() {
        // (0,0) and (1,0) are the only two cells left for value 1 in row 0.
        // They also share box (0,0), so the moment the row narrows to that
        // pair it's a subset of the box, and box (0,0)'s other 7 cells
        // cannot hold value 1 either.
        let mut puzzle = Puzzle::new(Magnitude::new(3));
        let (mut events, root) = EventTree::new();
        let n = puzzle.claim_universe().len();

        let c00 = puzzle.claim_at(0, 0, 0);
        let c10 = puzzle.claim_at(1, 0, 0);
        let row0 = puzzle.row_fact(0, 0);
        let eliminate = puzzle.fact(row0).members.difference(&BackedSet::from_items(n, [c00, c10]));
        puzzle
            .force_false(&eliminate, &mut events, root, "test setup")
            .expect("consistent setup");

        for (x, y) in [(2, 0), (0, 1), (1, 1), (2, 1), (0, 2), (1, 2), (2, 2)] {
            assert_eq!(puzzle.claim(puzzle.claim_at(x, y, 0)).state(), ClaimState::False);
        }
    }

    #[test]
    fn solves_an_easy_nine_by_nine_puzzle() {
        // A masked well-known valid 9x9 solution grid (a third of its cells
        // blanked) — enough givens that the cheap techniques alone should
        // finish it, but the full pipeline is what's under test here.
        let text = ". 3 4 . 7 8 . 1 2\n\
                    6 7 . 1 9 . 3 4 .\n\
                    1 . 8 3 . 2 5 . 7\n\
                    . 5 9 . 6 1 . 2 3\n\
                    4 2 . 8 5 . 7 9 .\n\
                    7 . 3 9 . 4 8 . 6\n\
                    . 6 1 . 3 7 . 8 4\n\
                    2 8 . 4 1 . 6 3 .\n\
                    3 . 5 2 . 6 1 . 9";
        let loader = TokenLoader::new(text);
        let config = Config::default();
        let report = solve(Magnitude::new(3), &loader, &config, &(), &mut NullObserver).expect("should solve");
        assert_eq!(report.outcome, SolveOutcome::Solved);
        assert_eq!(report.puzzle.true_value_at(0, 0), Some(5));
        assert_eq!(report.puzzle.true_value_at(8, 8), Some(9));
    }

    #[test]
    fn a_puzzle_with_a_genuine_symmetry_is_reported_stuck_not_guessed() {
        // Both boxes on the left (and, independently, both on the right)
        // can swap 3 and 4 between their two undetermined cells and remain
        // fully consistent — no deduction, deterministic or hypothetical,
        // prefers one completion over the other, so the solver must stop
        // short rather than commit to an arbitrary guess.
        let loader = TokenLoader::new("1 2 . .\n. . 2 1\n. . 1 2\n2 1 . .");
        let config = Config::default();
        let report = solve(Magnitude::new(2), &loader, &config, &(), &mut NullObserver).expect("no contradiction");
        assert_eq!(report.outcome, SolveOutcome::StuckButConsistent);
    }
}
