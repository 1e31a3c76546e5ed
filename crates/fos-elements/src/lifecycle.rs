//! Element lifecycle notifications

use fos_dom::NodeId;

use crate::emitter::{EventEmitter, Subscription};

/// Connection change of a component-backed element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connected { tag: String, node: NodeId },
    Disconnected { tag: String, node: NodeId },
}

impl LifecycleEvent {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Connected { node, .. } | Self::Disconnected { node, .. } => *node,
        }
    }
}

/// Observers of element connections, shared by the element classes that
/// were created with it
#[derive(Debug, Default)]
pub struct LifecycleRegistry {
    events: EventEmitter<LifecycleEvent>,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&LifecycleEvent) + 'static) -> Subscription {
        self.events.subscribe(listener)
    }

    pub(crate) fn notify(&self, event: LifecycleEvent) {
        tracing::trace!("Lifecycle: {:?}", event);
        self.events.emit(event);
    }
}
