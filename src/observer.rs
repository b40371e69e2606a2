//! Live narration of the solve (§6). The same narrow, presentation-only use
//! of `crossterm::style::Stylize` the teacher's `main.rs` used for
//! `println!("{}", "Rune Lock".red())` — nothing else in this crate touches
//! the terminal.

use crossterm::style::Stylize;

use crate::event::Event;

/// Something that wants to know about each top-level event the driver
/// records, in order. The event tree itself remains the source of truth —
/// an observer is free to ignore everything it's told.
pub trait Observer {
    fn observe(&mut self, event: &Event);
}

/// An observer that does nothing — the default when nobody asked for
/// narration.
pub struct NullObserver;

impl Observer for NullObserver {
    fn observe(&mut self, _event: &Event) {}
}

/// Prints each event to stdout, colorized by how many claims it falsified.
pub struct TraceObserver;

impl Observer for TraceObserver {
    fn observe(&mut self, event: &Event) {
        let line = format!("{event}");
        if event.falsified.is_empty() {
            println!("{}", line.as_str().grey());
        } else if event.falsified.len() == 1 {
            println!("{}", line.as_str().yellow());
        } else {
            println!("{}", line.as_str().cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimId;
    use crate::universe::BackedSet;

    #[test]
    fn null_observer_accepts_any_event() {
        let mut observer = NullObserver;
        let event = Event::new("test", BackedSet::<ClaimId>::empty(4));
        observer.observe(&event);
    }
}
