//! DOM Events
//!
//! Custom events and per-node listener storage.

use std::collections::HashMap;
use std::rc::Rc;

use crate::{NodeId, Value};

/// Custom event (`new CustomEvent(type, { detail })`)
#[derive(Debug, Clone)]
pub struct CustomEvent {
    pub event_type: String,
    pub detail: Value,
    pub target: NodeId,
    pub current_target: NodeId,
    pub bubbles: bool,
    pub cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl CustomEvent {
    /// Create a non-bubbling, non-cancelable event
    pub fn new(event_type: &str, detail: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            detail,
            target: NodeId::NONE,
            current_target: NodeId::NONE,
            bubbles: false,
            cancelable: false,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn bubbling(mut self) -> Self {
        self.bubbles = true;
        self
    }

    pub fn cancelable(mut self) -> Self {
        self.cancelable = true;
        self
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Event listener callback
pub type Listener = Rc<dyn Fn(&mut CustomEvent)>;

/// Listener handle returned by `add_event_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Listeners keyed by node and event type
#[derive(Default)]
pub struct EventListeners {
    next_id: u32,
    listeners: HashMap<(NodeId, String), Vec<(ListenerId, Listener)>>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: NodeId, event_type: &str, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry((node, event_type.to_string()))
            .or_default()
            .push((id, listener));
        id
    }

    /// Returns whether a listener was removed
    pub fn remove(&mut self, id: ListenerId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Snapshot of listeners for a node, in registration order
    pub fn snapshot(&self, node: NodeId, event_type: &str) -> Vec<Listener> {
        self.listeners
            .get(&(node, event_type.to_string()))
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners
            .get(&(node, event_type.to_string()))
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_custom_event_defaults() {
        let event = CustomEvent::new("save", Value::from(42));
        assert!(!event.bubbles);
        assert!(!event.cancelable);
        assert_eq!(event.detail, Value::from(42));
    }

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut event = CustomEvent::new("x", Value::Undefined);
        event.prevent_default();
        assert!(!event.is_default_prevented());

        let mut event = CustomEvent::new("x", Value::Undefined).cancelable();
        event.prevent_default();
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_listener_add_remove() {
        let mut listeners = EventListeners::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = listeners.add(NodeId(1), "save", Rc::new(move |_| h.set(h.get() + 1)));

        let mut event = CustomEvent::new("save", Value::Undefined);
        for listener in listeners.snapshot(NodeId(1), "save") {
            listener(&mut event);
        }
        assert_eq!(hits.get(), 1);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert_eq!(listeners.count(NodeId(1), "save"), 0);
    }
}
