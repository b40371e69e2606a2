//! The solve-time event tree (§4.5, I6).
//!
//! This is the same append-only arena the teacher used twice — once for
//! `AssumptionTree<FactSolverState>`, once for `SolverNodes` — generalized
//! to one owned-children tree of [`Event`]s. Unlike the teacher's trees
//! there is no mutable "focus" cursor: that existed only to drive the
//! animation playback the design notes say is out of scope here.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::claim::ClaimId;
use crate::universe::BackedSet;

/// A handle into an [`EventTree`]. Cheap, `Copy`, stable for the tree's
/// lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EventId(usize);

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// One node in the event tree: the claims one technique (or one
/// auto-resolution cascade step) falsified, plus a human-readable
/// description of why (§4.5).
#[derive(Clone, Debug)]
pub struct Event {
    pub description: String,
    pub falsified: BackedSet<ClaimId>,
}

impl Event {
    pub fn new(description: impl Into<String>, falsified: BackedSet<ClaimId>) -> Self {
        Self {
            description: description.into(),
            falsified,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (falsified {} claim(s))", self.description, self.falsified.len())
    }
}

struct EventNode {
    parent: Option<EventId>,
    data: Event,
    children: Vec<EventId>,
}

/// The owning arena of all events for one solve. The root is an opaque,
/// empty-falsification node created by [`EventTree::new`]; every technique's
/// top-level event is inserted as (eventually nested) descendant of it.
pub struct EventTree {
    nodes: Vec<EventNode>,
}

#[derive(Debug, Error)]
pub enum EventTreeError {
    #[error("event {0} does not exist")]
    UnknownEvent(usize),
}

impl EventTree {
    /// Creates a tree with an opaque root event and returns its handle.
    pub fn new() -> (Self, EventId) {
        (
            Self {
                nodes: vec![EventNode {
                    parent: None,
                    data: Event::new("solve started", BackedSet::empty(0)),
                    children: Vec::new(),
                }],
            },
            EventId(0),
        )
    }

    pub fn root(&self) -> EventId {
        EventId(0)
    }

    pub fn insert_child(&mut self, parent: EventId, data: Event) -> EventId {
        self.nodes.push(EventNode {
            parent: Some(parent),
            data,
            children: Vec::new(),
        });
        let handle = EventId(self.nodes.len() - 1);
        self.nodes[parent.0].children.push(handle);
        handle
    }

    pub fn get(&self, id: EventId) -> Result<&Event, EventTreeError> {
        self.nodes.get(id.0).map(|n| &n.data).ok_or(EventTreeError::UnknownEvent(id.0))
    }

    pub fn parent_of(&self, id: EventId) -> Option<EventId> {
        self.nodes[id.0].parent
    }

    pub fn children_of(&self, id: EventId) -> &[EventId] {
        &self.nodes[id.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// In-order (parent before children, children in insertion order) walk
    /// of the whole tree — the traversal property test P8 (determinism)
    /// checks by comparing two such walks.
    pub fn walk(&self) -> Vec<EventId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl std::ops::Index<EventId> for EventTree {
    type Output = Event;

    fn index(&self, index: EventId) -> &Self::Output {
        &self.nodes[index.0].data
    }
}

impl Display for EventTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn write_node(tree: &EventTree, id: EventId, indent: usize, f: &mut Formatter<'_>) -> std::fmt::Result {
            writeln!(f, "{0:1$} - ({3}) {2}", "", indent, tree[id], id)?;
            for &child in tree.children_of(id) {
                write_node(tree, child, indent + 2, f)?;
            }
            Ok(())
        }
        write_node(self, self.root(), 0, f)
    }
}
