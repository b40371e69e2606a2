//! The what-if (hypothetical) engine (§4.4): explores a fact's remaining
//! candidates as mutually-exclusive assumptions and keeps whatever all
//! surviving branches agree on.
//!
//! Grounded on the teacher's `SolverState::with_assumed`/`deduce_with_assumption`
//! in `solver/solver_state.rs` — clone, assume, propagate to a fixed point,
//! read off the result — generalized from one fixed `[FieldState; 12]` to
//! cloning a whole [`Puzzle`], and from a single assumption to exploring
//! every candidate of a chosen fact at once so the branches can be compared
//! against each other.

use log::{debug, trace};

use crate::claim::ClaimId;
use crate::event::{Event, EventId, EventTree};
use crate::fact::FactId;
use crate::puzzle::{Contradiction, Puzzle};
use crate::universe::BackedSet;

/// Runs the non-hypothetical techniques to a fixed point inside a branch.
/// The driver passes its own technique loop in here rather than `whatif`
/// depending on `driver` directly.
pub type Propagate = fn(&mut Puzzle, &mut EventTree, EventId) -> Result<(), Contradiction>;

fn pick_branch_fact(puzzle: &Puzzle) -> Option<FactId> {
    puzzle
        .facts()
        .iter()
        .enumerate()
        .filter(|(_, fact)| fact.size() >= 2)
        .min_by_key(|(_, fact)| fact.size())
        .map(|(i, _)| FactId(i))
}

struct Branch {
    claim: ClaimId,
    outcome: Result<BackedSet<ClaimId>, Contradiction>,
}

/// Explores one candidate as a hypothesis: clone the puzzle, assume it true,
/// propagate, optionally recurse one level deeper if that alone was
/// indecisive and `depth` allows it. Returns the set of claims that ended up
/// false in the clone beyond what was already false before the assumption.
fn explore_branch(puzzle: &Puzzle, claim: ClaimId, depth: usize, propagate: Propagate) -> Branch {
    let mut clone = puzzle.clone();
    let (mut local_events, local_root) = EventTree::new();

    let outcome = (|| -> Result<BackedSet<ClaimId>, Contradiction> {
        clone.assume(claim, &mut local_events, local_root)?;
        propagate(&mut clone, &mut local_events, local_root)?;
        if depth > 0 && !clone.is_fully_decided() {
            explore_depth(&mut clone, &mut local_events, local_root, depth - 1, propagate)?;
        }
        let mut falsified = clone.claim_universe().empty_set();
        for before_after in puzzle.claims().iter().zip(clone.claims().iter()).enumerate() {
            let (id, (before, after)) = before_after;
            if before.is_active() && !after.is_active() && after.state() == crate::claim::ClaimState::False {
                falsified.insert(ClaimId(id));
            }
        }
        Ok(falsified)
    })();

    Branch { claim, outcome }
}

/// Explores every remaining candidate of the smallest undecided fact as a
/// mutually-exclusive hypothesis, intersects the consequences of the
/// surviving branches, and applies whatever that intersection (plus any
/// outright-contradictory branches) rules out (§4.4, I5). `depth` bounds how
/// many nested levels of hypothesizing a single branch may use to resolve
/// itself before its consequences are read off.
pub fn explore_depth(
    puzzle: &mut Puzzle,
    events: &mut EventTree,
    parent: EventId,
    depth: usize,
    propagate: Propagate,
) -> Result<Option<EventId>, Contradiction> {
    let fact = match pick_branch_fact(puzzle) {
        Some(fact) => fact,
        None => return Ok(None),
    };
    let candidates: Vec<ClaimId> = puzzle.fact(fact).members.iter().collect();
    debug!(
        "what-if: exploring {} candidate(s) of {} at depth {depth}",
        candidates.len(),
        puzzle.fact(fact).key
    );

    let branches: Vec<Branch> = candidates
        .into_iter()
        .map(|claim| explore_branch(puzzle, claim, depth, propagate))
        .collect();

    let mut definite_eliminate = puzzle.claim_universe().empty_set();
    let mut surviving_intersection: Option<BackedSet<ClaimId>> = None;

    for branch in &branches {
        match &branch.outcome {
            Err(_) => {
                trace!("what-if: {} leads to a contradiction, eliminating it", branch.claim);
                definite_eliminate.insert(branch.claim);
            }
            Ok(falsified) => {
                surviving_intersection = Some(match surviving_intersection {
                    Some(running) => running.intersection(falsified),
                    None => falsified.clone(),
                });
            }
        }
    }

    if branches.iter().all(|b| b.outcome.is_err()) {
        return Err(Contradiction::NoCandidates { fact: puzzle.fact(fact).key });
    }

    let mut eliminate = definite_eliminate;
    if let Some(common) = surviving_intersection {
        eliminate.union_with(&common);
    }

    if eliminate.is_empty() {
        return Ok(None);
    }

    let description = format!(
        "what-if over {}: {} claim(s) false in every surviving branch",
        puzzle.fact(fact).key,
        eliminate.len()
    );
    let label = events.insert_child(parent, Event::new(description, BackedSet::empty(puzzle.claim_universe().len())));
    puzzle.force_false(&eliminate, events, label, "consequence-set intersection")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Magnitude;
    use crate::initializer::initialize;
    use crate::loader::TokenLoader;

    fn no_op_propagate(_puzzle: &mut Puzzle, _events: &mut EventTree, _parent: EventId) -> Result<(), Contradiction> {
        Ok(())
    }

    #[test]
    fn finds_nothing_on_a_fully_decided_puzzle() {
        let mut puzzle = Puzzle::new(Magnitude::new(2));
        let loader = TokenLoader::new("1 2 . .\n. . 1 2\n2 1 . .\n. . 2 1");
        let (mut events, root) = EventTree::new();
        initialize(&mut puzzle, &loader, &mut events, root).expect("consistent givens");
        assert!(puzzle.is_fully_decided());

        let result = explore_depth(&mut puzzle, &mut events, root, 0, no_op_propagate).expect("no contradiction");
        assert_eq!(result, None);
    }

    /// Stands in for the driver's real propagate loop: rejects whichever
    /// branch made claim (0,0,0) true, accepts the other. Lets the branching
    /// logic itself (contradiction detection, surviving-intersection,
    /// applying the result) be tested without hand-deriving a puzzle whose
    /// deterministic techniques are all independently known to fail first.
    fn propagate_rejecting_z0(
        puzzle: &mut Puzzle,
        _events: &mut EventTree,
        _parent: EventId,
    ) -> Result<(), Contradiction> {
        let doomed = puzzle.claim_at(0, 0, 0);
        if puzzle.claim(doomed).state() == crate::claim::ClaimState::True {
            return Err(Contradiction::NoCandidates {
                fact: puzzle.fact(puzzle.cell_fact(0, 0)).key,
            });
        }
        Ok(())
    }

    #[test]
    fn eliminates_the_branch_that_leads_to_a_contradiction() {
        // Cell (0,0) is narrowed to exactly two candidates and nothing else
        // on the puzzle is touched, so it's the only branch point. One
        // candidate is declared contradictory by the stand-in propagate
        // function; the other survives, and explore_depth must settle the
        // cell on the surviving candidate.
        let mut puzzle = Puzzle::new(Magnitude::new(2));
        let (mut events, root) = EventTree::new();
        let n = puzzle.claim_universe().len();

        let keep = BackedSet::from_items(n, [puzzle.claim_at(0, 0, 0), puzzle.claim_at(0, 0, 1)]);
        let cell00 = puzzle.cell_fact(0, 0);
        let eliminate = puzzle.fact(cell00).members.difference(&keep);
        puzzle
            .force_false(&eliminate, &mut events, root, "test setup: narrow (0,0) to z in {0,1}")
            .expect("consistent setup");

        let doomed = puzzle.claim_at(0, 0, 0);
        let survivor = puzzle.claim_at(0, 0, 1);

        let result = explore_depth(&mut puzzle, &mut events, root, 0, propagate_rejecting_z0).expect("one branch survives");
        assert!(result.is_some());
        assert_eq!(puzzle.claim(doomed).state(), crate::claim::ClaimState::False);
        assert_eq!(puzzle.claim(survivor).state(), crate::claim::ClaimState::True);
    }
}
