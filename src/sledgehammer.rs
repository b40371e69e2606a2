//! The sledgehammer technique (§4.2): a single generalized subset inference
//! that subsumes naked/hidden singles, pairs, triples and the fish family
//! (X-wing, swordfish, jellyfish) — and, because sources and recipients are
//! not restricted to one species, any cross-species subset cover the same
//! lemma happens to catch.
//!
//! The underlying lemma: if `sources` is a set of `k` claim-disjoint facts
//! and `recipients` is a set of `k` claim-disjoint facts with
//! `union(sources) ⊆ union(recipients)`, then every claim in `recipients`
//! that isn't also in `sources` can be falsified — the `k` true claims
//! required by `sources` already account for one true claim in each of the
//! `k` recipients, leaving no room for any other member of theirs to be
//! true. Naked pairs, hidden pairs and X-wing are all this same lemma with
//! different species chosen for `sources`/`recipients`.
//!
//! Search is growth-by-seed rather than combinatorial: each distinct fact
//! (facts with equal claim-sets collapse to one representative first) is
//! tried as a one-fact seed group, then grown one fact at a time, drawn from
//! the growth frontier — the facts visible to the current sources' visible
//! facts, excluding the sources and their immediate neighbors, so every
//! candidate is guaranteed claim-disjoint from every chosen source — until
//! either the covering condition fires or `max_size` is reached.

use itertools::Itertools;
use log::debug;

use crate::claim::ClaimId;
use crate::event::{EventId, EventTree};
use crate::fact::FactId;
use crate::puzzle::{Contradiction, Puzzle};
use crate::universe::BackedSet;

/// Sledgehammers smaller than this are already handled elsewhere: size 1 by
/// singleton collapse, size 2 by the color-chain engine (§4.2 stipulations).
const MIN_SOURCES: usize = 3;

#[derive(Clone, Debug)]
pub struct SledgehammerMove {
    pub sources: Vec<FactId>,
    pub recipients: Vec<FactId>,
    pub eliminate: BackedSet<ClaimId>,
}

fn pairwise_disjoint(puzzle: &Puzzle, facts: &[FactId]) -> bool {
    for (i, &a) in facts.iter().enumerate() {
        for &b in &facts[i + 1..] {
            if puzzle.fact(a).members.intersects(&puzzle.fact(b).members) {
                return false;
            }
        }
    }
    true
}

fn recipients_of(puzzle: &Puzzle, union_sources: &BackedSet<ClaimId>, sources: &[FactId]) -> Vec<FactId> {
    puzzle
        .facts_touching(union_sources)
        .into_iter()
        .filter(|f| !sources.contains(f))
        .collect()
}

/// Every source intersects at least two recipients and vice versa — a
/// source or recipient touching only one partner reduces to a smaller
/// sledgehammer already explored (§4.2 stipulations).
fn each_meets_at_least_two(puzzle: &Puzzle, facts: &[FactId], partners: &[FactId]) -> bool {
    facts.iter().all(|&f| {
        partners
            .iter()
            .filter(|&&p| puzzle.fact(f).members.intersects(&puzzle.fact(p).members))
            .count()
            >= 2
    })
}

/// Facts with equal claim-sets collapse to a single representative — the
/// first one encountered in ascending id order — before enumeration, so
/// equivalent facts don't bloat the search (§4.2 distinct-facts filter).
fn distinct_facts(puzzle: &Puzzle) -> Vec<FactId> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for (i, fact) in puzzle.facts().iter().enumerate() {
        if seen.insert(fact.members.clone()) {
            out.push(FactId(i));
        }
    }
    out
}

fn try_seed(puzzle: &Puzzle, seed: FactId, max_size: usize, distinct: &BackedSet<FactId>) -> Option<SledgehammerMove> {
    if puzzle.fact(seed).size() < 2 {
        return None;
    }

    let mut sources = vec![seed];
    let mut union_sources = puzzle.fact(seed).members.clone();
    let mut vis_cloud = BackedSet::from_items(puzzle.fact_universe().len(), puzzle.visible_facts(seed));

    loop {
        let recipients = recipients_of(puzzle, &union_sources, &sources);
        if sources.len() >= MIN_SOURCES
            && recipients.len() == sources.len()
            && !recipients.is_empty()
            && pairwise_disjoint(puzzle, &recipients)
            && each_meets_at_least_two(puzzle, &sources, &recipients)
            && each_meets_at_least_two(puzzle, &recipients, &sources)
        {
            let mut union_recipients = puzzle.claim_universe().empty_set();
            for &r in &recipients {
                union_recipients.union_with(&puzzle.fact(r).members);
            }
            let eliminate = union_recipients.difference(&union_sources);
            if !eliminate.is_empty() {
                return Some(SledgehammerMove {
                    sources,
                    recipients,
                    eliminate,
                });
            }
        }

        if sources.len() >= max_size {
            return None;
        }

        // vis_vis_cloud: the facts visible to the current vis_cloud, minus
        // the sources and vis_cloud themselves — the connectivity-guided
        // growth frontier (§4.2 "Disjoint & connected source walk").
        let mut vis_vis_cloud = puzzle.fact_universe().empty_set();
        for f in vis_cloud.iter() {
            vis_vis_cloud.union_with(&BackedSet::from_items(puzzle.fact_universe().len(), puzzle.visible_facts(f)));
        }
        let sources_set = BackedSet::from_items(puzzle.fact_universe().len(), sources.iter().copied());
        let frontier = vis_vis_cloud.difference(&sources_set).difference(&vis_cloud);

        let next = frontier
            .iter()
            .filter(|f| distinct.contains(*f) && puzzle.fact(*f).size() >= 2)
            .min_by_key(|&f| {
                let grown = union_sources.union(&puzzle.fact(f).members);
                recipients_of(puzzle, &grown, &sources).len()
            });

        match next {
            Some(f) => {
                vis_cloud.union_with(&BackedSet::from_items(puzzle.fact_universe().len(), puzzle.visible_facts(f)));
                vis_cloud.insert(f);
                union_sources.union_with(&puzzle.fact(f).members);
                sources.push(f);
            }
            None => return None,
        }
    }
}

/// Searches for one sledgehammer move, in ascending fact-id seed order for
/// determinism (P8). Does not mutate the puzzle.
pub fn find_one(puzzle: &Puzzle, max_size: usize) -> Option<SledgehammerMove> {
    let distinct_ids = distinct_facts(puzzle);
    let distinct = BackedSet::from_items(puzzle.fact_universe().len(), distinct_ids.iter().copied());
    for seed in distinct_ids {
        if let Some(mv) = try_seed(puzzle, seed, max_size, &distinct) {
            return Some(mv);
        }
    }
    None
}

/// Finds and applies one sledgehammer move. Returns `Ok(None)` when no move
/// up to `max_size` sources exists.
pub fn apply_one(
    puzzle: &mut Puzzle,
    events: &mut EventTree,
    parent: EventId,
    max_size: usize,
) -> Result<Option<EventId>, Contradiction> {
    let mv = match find_one(puzzle, max_size) {
        Some(mv) => mv,
        None => return Ok(None),
    };
    debug!(
        "sledgehammer: {} source(s), {} recipient(s), eliminating {} claim(s)",
        mv.sources.len(),
        mv.recipients.len(),
        mv.eliminate.len()
    );
    let sources = mv.sources.iter().map(|&f| puzzle.fact(f).key).join(", ");
    let recipients = mv.recipients.iter().map(|&f| puzzle.fact(f).key).join(", ");
    let description = format!("sledgehammer: [{sources}] covered by [{recipients}]");
    puzzle.force_false(&mv.eliminate, events, parent, description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Magnitude;
    use crate::event::EventTree;
    use crate::initializer::initialize;
    use crate::loader::TokenLoader;

    fn four_by_four_needing_pair() -> Puzzle {
        // A 4x4 puzzle solvable by naked singles alone would never reach
        // the sledgehammer search, so this one is left deliberately sparse:
        // row 0 has only two givens, forcing a naked/hidden pair somewhere
        // once singles are exhausted.
        let text = "1 2 . .\n\
                     . . 1 2\n\
                     2 1 . .\n\
                     . . 2 1";
        let mut puzzle = Puzzle::new(Magnitude::new(2));
        let loader = TokenLoader::new(text);
        let (mut events, root) = EventTree::new();
        initialize(&mut puzzle, &loader, &mut events, root).expect("consistent givens");
        puzzle
    }

    #[test]
    fn finds_no_move_when_everything_is_already_a_naked_single() {
        // After initialization and its cascades, a fully-determined 4x4
        // puzzle like this one collapses entirely via singleton/subset
        // collapse, leaving nothing for the sledgehammer search to do.
        let puzzle = four_by_four_needing_pair();
        assert!(puzzle.is_fully_decided());
        assert_eq!(find_one(&puzzle, 4), None);
    }

    #[test]
    fn recipients_of_is_empty_for_an_exhausted_fact() {
        let puzzle = four_by_four_needing_pair();
        let empty = puzzle.claim_universe().empty_set();
        assert!(recipients_of(&puzzle, &empty, &[]).is_empty());
    }
}
