//! Color-chain (§4.3): two-coloring of the xor sub-graph — the graph whose
//! edges are every size-2 fact, regardless of species — plus the
//! visible-color-contradiction elimination.
//!
//! Because a size-2 *cell* fact (a bi-value cell) is exactly as much an xor
//! edge here as a size-2 row/column/box fact (a conjugate pair), one BFS
//! over this graph already generalizes to XY-chains: a chain that alternates
//! through bi-value cells is just a path through cell-species edges in the
//! same component other chains build out of unit-species edges. There is no
//! separate XY-chain search — resolved in favor of treating it as this
//! module's own generalization rather than a standalone technique.
//!
//! A connected component bipartitions into two colors. Exactly one color is
//! true and the other false across the whole component — so:
//! - if two claims of the *same* color share any other fact, that color
//!   cannot be the true one (two members of one fact can't both be true),
//!   so the whole color is false (`color trap`).
//! - if some claim outside the component shares a fact with a color-A claim
//!   and a (possibly different) fact with a color-B claim, it is false
//!   regardless of which color turns out true (`visible-color-contradiction`).
//! - (the XY-chain generalisation) propagating each color all the way to a
//!   fixed point — not just one hop — and intersecting what that propagation
//!   falsifies under each color is unconditionally false, since one of the
//!   two colors must hold.

use std::collections::VecDeque;

use log::debug;

use crate::claim::{ClaimId, ClaimState};
use crate::event::{EventId, EventTree};
use crate::puzzle::{Contradiction, Puzzle};
use crate::universe::BackedSet;

/// The two color classes of one connected component of the xor graph.
struct Component {
    color_a: BackedSet<ClaimId>,
    color_b: BackedSet<ClaimId>,
}

fn build_components(puzzle: &Puzzle) -> Vec<Component> {
    let claim_count = puzzle.claim_universe().len();
    let mut visited = BackedSet::empty(claim_count);
    let mut components = Vec::new();

    for start in puzzle.active_claims() {
        if visited.contains(start) || puzzle.xor_partners(start).is_empty() {
            continue;
        }

        let mut color_a = BackedSet::empty(claim_count);
        let mut color_b = BackedSet::empty(claim_count);
        let mut queue = VecDeque::new();

        visited.insert(start);
        color_a.insert(start);
        queue.push_back((start, true));

        while let Some((claim, is_a)) = queue.pop_front() {
            for partner in puzzle.xor_partners(claim) {
                if visited.contains(partner) {
                    continue;
                }
                visited.insert(partner);
                if is_a {
                    color_b.insert(partner);
                } else {
                    color_a.insert(partner);
                }
                queue.push_back((partner, !is_a));
            }
        }

        components.push(Component { color_a, color_b });
    }

    components
}

fn is_trapped(puzzle: &Puzzle, color: &BackedSet<ClaimId>) -> bool {
    if color.len() < 2 {
        return false;
    }
    puzzle
        .facts_touching(color)
        .iter()
        .any(|&fact| puzzle.fact(fact).members.intersection(color).len() >= 2)
}

fn seen_by_color(puzzle: &Puzzle, color: &BackedSet<ClaimId>) -> BackedSet<ClaimId> {
    let mut seen = puzzle.claim_universe().empty_set();
    for fact in puzzle.facts_touching(color) {
        seen.union_with(&puzzle.fact(fact).members);
    }
    seen
}

/// Assumes every claim of `color` true on a scratch clone and drives the
/// puzzle's own propagation rules — "all claims visible to a newly-true
/// claim become false" and "a fact with all but one member false collapses
/// its last member to true" — to a fixed point, via the same
/// assert_true/force_false cascade `Puzzle` already runs for a real given.
/// Returns the claims that ended up false which weren't false before, or
/// the contradiction the cascade ran into if `color` itself is impossible.
fn propagate_color(puzzle: &Puzzle, color: &BackedSet<ClaimId>) -> Result<BackedSet<ClaimId>, Contradiction> {
    let mut scratch = puzzle.clone();
    let (mut local_events, local_root) = EventTree::new();
    for claim in color.iter() {
        scratch.assume(claim, &mut local_events, local_root)?;
    }

    let mut falsified = puzzle.claim_universe().empty_set();
    for (i, (before, after)) in puzzle.claims().iter().zip(scratch.claims().iter()).enumerate() {
        if before.state() == ClaimState::Active && after.state() == ClaimState::False {
            falsified.insert(ClaimId(i));
        }
    }
    Ok(falsified)
}

/// Finds and applies one color-chain elimination: a color trap if one
/// exists, then a visible-color-contradiction, then (the XY-chain
/// generalisation) whatever a full fixed-point propagation of each color
/// falsifies in common. Tries components in the order their seed claim was
/// first visited, for determinism (P8).
pub fn apply_one(
    puzzle: &mut Puzzle,
    events: &mut EventTree,
    parent: EventId,
) -> Result<Option<EventId>, Contradiction> {
    for component in build_components(puzzle) {
        if is_trapped(puzzle, &component.color_a) {
            debug!("color trap: falsifying color A, {} claim(s)", component.color_a.len());
            let description = format!("color trap falsifies {} claim(s)", component.color_a.len());
            return puzzle.force_false(&component.color_a, events, parent, description);
        }
        if is_trapped(puzzle, &component.color_b) {
            debug!("color trap: falsifying color B, {} claim(s)", component.color_b.len());
            let description = format!("color trap falsifies {} claim(s)", component.color_b.len());
            return puzzle.force_false(&component.color_b, events, parent, description);
        }

        let seen_by_a = seen_by_color(puzzle, &component.color_a);
        let seen_by_b = seen_by_color(puzzle, &component.color_b);
        let eliminate = seen_by_a
            .intersection(&seen_by_b)
            .difference(&component.color_a)
            .difference(&component.color_b);
        if !eliminate.is_empty() {
            debug!("visible-color-contradiction: eliminating {} claim(s)", eliminate.len());
            let description = "claim sees both colors of a chain".to_string();
            return puzzle.force_false(&eliminate, events, parent, description);
        }

        let pos = propagate_color(puzzle, &component.color_a);
        let neg = propagate_color(puzzle, &component.color_b);
        match (pos, neg) {
            (Err(_), Err(_)) => {
                debug!("xy-chain: both colors of a chain are individually contradictory");
                let mut both = component.color_a.clone();
                both.union_with(&component.color_b);
                return puzzle.force_false(&both, events, parent, "both colors of a chain are contradictory".to_string());
            }
            (Err(_), Ok(_)) => {
                debug!("xy-chain: color A is contradictory, falsifying it");
                let description = "assuming color A of a chain leads to a contradiction".to_string();
                return puzzle.force_false(&component.color_a, events, parent, description);
            }
            (Ok(_), Err(_)) => {
                debug!("xy-chain: color B is contradictory, falsifying it");
                let description = "assuming color B of a chain leads to a contradiction".to_string();
                return puzzle.force_false(&component.color_b, events, parent, description);
            }
            (Ok(falsified_by_a), Ok(falsified_by_b)) => {
                let eliminate = falsified_by_a
                    .intersection(&falsified_by_b)
                    .difference(&component.color_a)
                    .difference(&component.color_b);
                if !eliminate.is_empty() {
                    debug!("xy-chain: eliminating {} claim(s) false under both colors", eliminate.len());
                    let description = "false under both color states once each is propagated to a fixed point".to_string();
                    return puzzle.force_false(&eliminate, events, parent, description);
                }
            }
        }
    }
    Ok(None)
}
