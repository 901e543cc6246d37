//! text-marker DOM - headless Document Object Model
//!
//! Arena-allocated node tree with the pieces of a browser document the
//! annotation widget relies on: attributes, native text selection,
//! capture/bubble event dispatch, element geometry and scroll state.

mod node;
mod tree;
mod document;
mod operations;
pub mod dom_events;
pub mod geometry;
pub mod layout;
pub mod range;

pub use node::{Attribute, ElementData, Node, NodeData, ScrollState};
pub use tree::{Children, DomTree};
pub use document::Document;
pub use operations::{DomError, DomResult};
pub use dom_events::{DispatchStep, DomEvent, EventPhase, EventRegistry, EventType, HandlerId, ListenerOptions};
pub use geometry::DOMRect;
pub use layout::InlineMetrics;
pub use range::{BoundaryPoint, Range, Selection, SelectionType};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this ID refers to a node at all
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena slot of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}
