//! fOS DOM - Document Object Model
//!
//! Arena-backed DOM tree with custom element reactions, custom events and the
//! window event loop used to defer work.

mod node;
mod tree;
mod document;
mod value;
pub mod custom_elements;
pub mod dom_events;
pub mod selector;
pub mod timers;

pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use tree::DomTree;
pub use document::{Document, ElementRef, ReactionError};
pub use value::Value;
pub use custom_elements::{
    CallbackError, CustomElementConstructor, CustomElementError, CustomElementReactions,
    LifecycleCallback,
};
pub use dom_events::{CustomEvent, ListenerId};
pub use selector::{SelectorError, SelectorList};
pub use timers::{EventLoop, FrameId, TimerId};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Absent node
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// DOM mutation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),

    #[error("Node {0:?} is not a child of the given parent")]
    NotAChild(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Insertion would create a cycle or move the document node")]
    HierarchyRequest,
}
