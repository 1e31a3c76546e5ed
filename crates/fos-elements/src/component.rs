//! Component framework interfaces
//!
//! The adapter drives components through these traits. Component creation,
//! rendering and application-wide change detection belong to the framework
//! implementing them; [`crate::platform`] provides an in-process one.

use std::rc::Rc;

use fos_dom::{ElementRef, NodeId, Value};

use crate::definition::{ComponentDefinition, ComponentType};
use crate::emitter::EventEmitter;
use crate::injector::Injector;

/// One input mutation, as reported to `on_changes`
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleChange {
    pub previous_value: Value,
    pub current_value: Value,
    pub first_change: bool,
}

impl SimpleChange {
    pub fn new(previous_value: Value, current_value: Value, first_change: bool) -> Self {
        Self {
            previous_value,
            current_value,
            first_change,
        }
    }

    pub fn is_first_change(&self) -> bool {
        self.first_change
    }
}

/// Changes consolidated for one `on_changes` call, in recording order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleChanges {
    entries: Vec<(String, SimpleChange)>,
}

impl SimpleChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prop_name: &str) -> Option<&SimpleChange> {
        self.entries
            .iter()
            .find(|(name, _)| name == prop_name)
            .map(|(_, change)| change)
    }

    pub fn get_mut(&mut self, prop_name: &str) -> Option<&mut SimpleChange> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == prop_name)
            .map(|(_, change)| change)
    }

    pub fn insert(&mut self, prop_name: &str, change: SimpleChange) {
        match self.get_mut(prop_name) {
            Some(existing) => *existing = change,
            None => self.entries.push((prop_name.to_string(), change)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SimpleChange)> {
        self.entries.iter().map(|(name, change)| (name.as_str(), change))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A live component instance.
///
/// Hooks take `&self`: an output emitted from inside a hook may synchronously
/// reach listeners that read or write this instance's inputs again. State is
/// kept in `Cell`/`RefCell` fields, and no field borrow may be held across an
/// `emit`.
pub trait Component {
    /// Write a declared input property
    fn set_input(&self, prop_name: &str, value: Value);

    /// Read a declared input property
    fn input(&self, prop_name: &str) -> Value;

    /// Emitter backing a declared output
    fn output(&self, _prop_name: &str) -> Option<EventEmitter> {
        None
    }

    /// Whether the component wants `on_changes` notifications
    fn implements_on_changes(&self) -> bool {
        false
    }

    fn on_changes(&self, _changes: &SimpleChanges) {}

    /// Update rendered output; called by each change detection pass
    fn render(&self) {}

    fn on_destroy(&self) {}
}

/// The component's host view
pub trait ViewRef {
    /// Run one change detection pass
    fn detect_changes(&self);

    /// Flag the view as dirty for the next application-wide pass
    fn mark_for_check(&self) {}
}

/// Handle to a created component
pub trait ComponentRef {
    fn instance(&self) -> Rc<dyn Component>;

    fn host_view(&self) -> Rc<dyn ViewRef>;

    fn destroy(&self);
}

/// Application-wide update cycle
pub trait ApplicationRef {
    /// Include the view in application change detection
    fn attach_view(&self, view: Rc<dyn ViewRef>);

    fn detach_view(&self, view: &Rc<dyn ViewRef>);
}

/// Creates instances of one component type
pub trait ComponentFactory {
    fn definition(&self) -> &ComponentDefinition;

    /// Create a component hosted by `host`, with `projectable_nodes` holding
    /// one bucket per content selector
    fn create(
        &self,
        injector: Rc<Injector>,
        projectable_nodes: Vec<Vec<NodeId>>,
        host: &ElementRef,
    ) -> anyhow::Result<Rc<dyn ComponentRef>>;
}

/// Looks up the factory of a component type
pub trait ComponentFactoryResolver {
    fn resolve_component_factory(&self, component: ComponentType) -> Option<Rc<dyn ComponentFactory>>;
}
