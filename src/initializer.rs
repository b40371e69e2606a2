//! Turns a loader's givens into init facts on a freshly built puzzle (§3.2).
//!
//! This is deliberately thin: each given is asserted one at a time through
//! `Puzzle::assert_given`, which already knows how to record the event and
//! cascade the consequences. There is no separate cascade logic here — the
//! open question of whether the initializer should do its own propagation
//! is resolved by not needing to.

use log::info;
use thiserror::Error;

use crate::event::{EventId, EventTree};
use crate::loader::{Loader, LoaderError};
use crate::puzzle::{Contradiction, Puzzle};

#[derive(Debug, Error)]
pub enum InitializerError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("puzzle's givens are contradictory: {0}")]
    Contradiction(#[from] Contradiction),
}

/// Loads and asserts every given from `loader` onto `puzzle`, in the order
/// the loader produced them.
pub fn initialize(
    puzzle: &mut Puzzle,
    loader: &dyn Loader,
    events: &mut EventTree,
    root: EventId,
) -> Result<(), InitializerError> {
    let givens = loader.load(puzzle.magnitude())?;
    info!("asserting {} given(s)", givens.len());
    for given in givens {
        puzzle.assert_given(given.x, given.y, given.z, events, root)?;
    }
    Ok(())
}
