//! Component strategy
//!
//! Owns one component instance on behalf of one custom element: creation on
//! connect, input buffering and forwarding, batched change detection, output
//! bridging and delayed destruction on disconnect.
//!
//! ```text
//! Unattached --connect--> Live --disconnect--> PendingDestroy
//!     ^                    ^                        |  |
//!     |                    +-------connect----------+  |
//!     +----------------destroy timer fires-------------+
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use fos_dom::{ElementRef, Value};

use crate::component::{
    ApplicationRef, Component, ComponentFactory, ComponentRef, SimpleChange, SimpleChanges, ViewRef,
};
use crate::config::ElementsConfig;
use crate::definition::{ComponentDefinition, InputTransform};
use crate::error::{ElementsError, Result};
use crate::events::EventBridge;
use crate::injector::Injector;
use crate::projection::extract_projectable_nodes;
use crate::scheduler::{Cancel, Scheduler};

/// Mediates between a custom element and the component backing it
pub trait ElementStrategy {
    /// Create the component, or keep the existing one if a destroy is pending
    fn connect(&self, host: &ElementRef) -> Result<()>;

    /// Schedule destruction of the component
    fn disconnect(&self);

    fn input_value(&self, prop_name: &str) -> Value;

    fn set_input_value(&self, prop_name: &str, value: Value, transform: Option<&InputTransform>);

    /// Output stream, if the strategy can provide one right now
    fn events(&self) -> Option<EventBridge>;
}

/// Where a strategy is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyPhase {
    /// No component instance
    Unattached,
    /// Component instance exists and is attached to the application
    Live,
    /// Live, with a destroy timer armed
    PendingDestroy,
}

struct LiveComponent {
    component_ref: Rc<dyn ComponentRef>,
    instance: Rc<dyn Component>,
    view: Rc<dyn ViewRef>,
    app: Rc<dyn ApplicationRef>,
    implements_on_changes: bool,
}

struct StrategyState {
    component: Option<LiveComponent>,
    /// Inputs written before the component exists
    initial_input_values: HashMap<String, Value>,
    /// Inputs that have not changed since the component was created
    unchanged_inputs: HashSet<String>,
    input_changes: Option<SimpleChanges>,
    has_input_changes: bool,
    scheduled_destroy: Option<Cancel>,
    scheduled_detection: Option<Cancel>,
}

/// Default [`ElementStrategy`] backed by a [`ComponentFactory`]
pub struct ComponentStrategy {
    this: Weak<ComponentStrategy>,
    factory: Rc<dyn ComponentFactory>,
    injector: Rc<Injector>,
    config: ElementsConfig,
    events: EventBridge,
    scheduler: RefCell<Option<Scheduler>>,
    state: RefCell<StrategyState>,
}

impl ComponentStrategy {
    pub fn new(
        factory: Rc<dyn ComponentFactory>,
        injector: Rc<Injector>,
        config: ElementsConfig,
    ) -> Rc<Self> {
        let unchanged_inputs = input_names(factory.definition());
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            factory,
            injector,
            config,
            events: EventBridge::new(),
            scheduler: RefCell::new(None),
            state: RefCell::new(StrategyState {
                component: None,
                initial_input_values: HashMap::new(),
                unchanged_inputs,
                input_changes: None,
                has_input_changes: false,
                scheduled_destroy: None,
                scheduled_detection: None,
            }),
        })
    }

    pub fn definition(&self) -> &ComponentDefinition {
        self.factory.definition()
    }

    pub fn phase(&self) -> StrategyPhase {
        let state = self.state.borrow();
        match (&state.component, &state.scheduled_destroy) {
            (None, _) => StrategyPhase::Unattached,
            (Some(_), None) => StrategyPhase::Live,
            (Some(_), Some(_)) => StrategyPhase::PendingDestroy,
        }
    }

    /// The live component, if any
    pub fn component_ref(&self) -> Option<Rc<dyn ComponentRef>> {
        self.state
            .borrow()
            .component
            .as_ref()
            .map(|c| c.component_ref.clone())
    }

    fn initialize_component(&self, host: &ElementRef) -> Result<()> {
        let definition = self.factory.definition();
        let app = self.injector.require::<dyn ApplicationRef>()?;

        let scheduler = Scheduler::new(host.document().event_loop().clone())
            .with_frame_fallback(self.config.frame_fallback_delay);
        *self.scheduler.borrow_mut() = Some(scheduler);

        let child_injector = Rc::new(Injector::child(&self.injector));
        let projectable_nodes = extract_projectable_nodes(host, &definition.content_selectors);

        let component_ref = self
            .factory
            .create(child_injector, projectable_nodes, host)
            .map_err(|source| ElementsError::Creation {
                selector: definition.selector.clone(),
                source,
            })?;
        let instance = component_ref.instance();

        let mut outputs = Vec::with_capacity(definition.outputs.len());
        for output in &definition.outputs {
            let emitter = instance.output(&output.prop_name);
            match emitter {
                Some(emitter) => outputs.push((output.event_name.clone(), emitter)),
                None => {
                    component_ref.destroy();
                    return Err(ElementsError::MissingOutput {
                        selector: definition.selector.clone(),
                        output: output.prop_name.clone(),
                    });
                }
            }
        }

        let implements_on_changes = instance.implements_on_changes();
        let view = component_ref.host_view();
        self.state.borrow_mut().component = Some(LiveComponent {
            component_ref,
            instance,
            view: view.clone(),
            app: app.clone(),
            implements_on_changes,
        });
        tracing::debug!("Created component <{}>", definition.selector);

        self.initialize_inputs();
        self.events.bind(outputs);
        self.detect_changes();
        app.attach_view(view);
        Ok(())
    }

    /// Apply buffered inputs in declaration order
    fn initialize_inputs(&self) {
        let initial = std::mem::take(&mut self.state.borrow_mut().initial_input_values);
        for input in &self.factory.definition().inputs {
            if let Some(value) = initial.get(&input.prop_name) {
                self.set_input_value(&input.prop_name, value.clone(), input.transform.as_ref());
            }
        }
    }

    fn schedule_detect_changes(&self) {
        if self.state.borrow().scheduled_detection.is_some() {
            return;
        }
        let Some(scheduler) = self.scheduler.borrow().clone() else {
            return;
        };

        let ran = Rc::new(Cell::new(false));
        let (task_ran, this) = (ran.clone(), self.this.clone());
        let cancel = scheduler.schedule_before_next_paint(move || {
            task_ran.set(true);
            if let Some(strategy) = this.upgrade() {
                strategy.state.borrow_mut().scheduled_detection = None;
                strategy.detect_changes();
            }
        });

        // Without a window the task has already run
        if !ran.get() {
            self.state.borrow_mut().scheduled_detection = Some(cancel);
        }
    }

    /// Flush pending input changes, then run one detection pass
    fn detect_changes(&self) {
        let (instance, view, changes, mark) = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let Some(live) = state.component.as_ref() else {
                return;
            };
            let (instance, view) = (live.instance.clone(), live.view.clone());
            let changes = if live.implements_on_changes {
                state.input_changes.take()
            } else {
                None
            };
            let mark = std::mem::take(&mut state.has_input_changes);
            (instance, view, changes, mark)
        };

        if let Some(changes) = changes {
            instance.on_changes(&changes);
        }
        if mark {
            view.mark_for_check();
        }
        view.detect_changes();
    }

    fn destroy_component(&self) {
        let (live, detection) = {
            let mut state = self.state.borrow_mut();
            state.scheduled_destroy = None;
            let Some(live) = state.component.take() else {
                return;
            };
            let detection = state.scheduled_detection.take();
            state.input_changes = None;
            state.has_input_changes = false;
            state.initial_input_values.clear();
            state.unchanged_inputs = input_names(self.factory.definition());
            (live, detection)
        };

        if let Some(detection) = detection {
            detection.cancel();
        }
        self.events.unbind();
        live.app.detach_view(&live.view);
        live.component_ref.destroy();
        tracing::debug!("Destroyed component <{}>", self.definition().selector);
    }
}

fn input_names(definition: &ComponentDefinition) -> HashSet<String> {
    definition.inputs.iter().map(|i| i.prop_name.clone()).collect()
}

/// Record a change for `on_changes`. A second write before the flush only
/// updates the current value.
fn record_input_change(state: &mut StrategyState, prop_name: &str, previous: Value, current: Value) {
    let first_change = state.unchanged_inputs.contains(prop_name);
    let changes = state.input_changes.get_or_insert_with(SimpleChanges::new);

    if let Some(pending) = changes.get_mut(prop_name) {
        pending.current_value = current;
        return;
    }

    let previous = if first_change { Value::Undefined } else { previous };
    changes.insert(prop_name, SimpleChange::new(previous, current, first_change));
}

impl ElementStrategy for ComponentStrategy {
    fn connect(&self, host: &ElementRef) -> Result<()> {
        let pending_destroy = self.state.borrow_mut().scheduled_destroy.take();
        if let Some(cancel) = pending_destroy {
            cancel.cancel();
            tracing::trace!("Reconnected <{}> before destroy", self.definition().selector);
            return Ok(());
        }

        if self.state.borrow().component.is_some() {
            return Ok(());
        }
        self.initialize_component(host)
    }

    fn disconnect(&self) {
        {
            let state = self.state.borrow();
            if state.component.is_none() || state.scheduled_destroy.is_some() {
                return;
            }
        }
        let Some(scheduler) = self.scheduler.borrow().clone() else {
            return;
        };

        let this = self.this.clone();
        let cancel = scheduler.schedule(
            move || {
                if let Some(strategy) = this.upgrade() {
                    strategy.destroy_component();
                }
            },
            self.config.destroy_delay,
        );
        self.state.borrow_mut().scheduled_destroy = Some(cancel);
        tracing::trace!(
            "Scheduled destroy of <{}> in {:?}",
            self.definition().selector,
            self.config.destroy_delay
        );
    }

    fn input_value(&self, prop_name: &str) -> Value {
        let instance = {
            let state = self.state.borrow();
            match &state.component {
                Some(live) => live.instance.clone(),
                None => {
                    return state
                        .initial_input_values
                        .get(prop_name)
                        .cloned()
                        .unwrap_or_default();
                }
            }
        };
        instance.input(prop_name)
    }

    fn set_input_value(&self, prop_name: &str, value: Value, transform: Option<&InputTransform>) {
        let (instance, implements_on_changes) = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            match &state.component {
                Some(live) => (live.instance.clone(), live.implements_on_changes),
                None => {
                    state.initial_input_values.insert(prop_name.to_string(), value);
                    return;
                }
            }
        };

        let value = match transform {
            Some(transform) => transform(value),
            None => value,
        };

        let current = instance.input(prop_name);
        {
            let mut state = self.state.borrow_mut();
            let first_change = state.unchanged_inputs.contains(prop_name);
            if value.strict_equals(&current) && !(value.is_undefined() && first_change) {
                return;
            }

            if implements_on_changes {
                record_input_change(&mut state, prop_name, current, value.clone());
            }
            state.unchanged_inputs.remove(prop_name);
            state.has_input_changes = true;
        }

        instance.set_input(prop_name, value);
        self.schedule_detect_changes();
    }

    fn events(&self) -> Option<EventBridge> {
        Some(self.events.clone())
    }
}
