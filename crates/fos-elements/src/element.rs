//! Component-backed custom elements
//!
//! [`create_custom_element`] turns a component type into a custom element
//! class. Every instance of the class lazily owns one [`ElementStrategy`]
//! and forwards its lifecycle callbacks, observed attributes and input
//! properties to it.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_dom::{
    CallbackError, CustomElementConstructor, CustomElementReactions, CustomEvent, Document,
    ElementRef, Value, custom_elements::validate_name,
};

use crate::config::ElementsConfig;
use crate::definition::{ComponentType, InputDef};
use crate::emitter::Subscription;
use crate::error::{ElementsError, Result};
use crate::events::EventBridge;
use crate::injector::Injector;
use crate::lifecycle::{LifecycleEvent, LifecycleRegistry};
use crate::strategy::ElementStrategy;
use crate::strategy_factory::{ComponentStrategyFactory, StrategyFactory, resolve_component_factory};

/// Options for [`create_custom_element`]
#[derive(Clone)]
pub struct NgElementConfig {
    /// Root injector; must provide a `ComponentFactoryResolver` and an
    /// `ApplicationRef`
    pub injector: Rc<Injector>,
    /// Replaces the default component strategy
    pub strategy_factory: Option<Rc<dyn StrategyFactory>>,
    pub lifecycle: Option<Rc<LifecycleRegistry>>,
    pub elements: ElementsConfig,
}

impl NgElementConfig {
    pub fn new(injector: Rc<Injector>) -> Self {
        Self {
            injector,
            strategy_factory: None,
            lifecycle: None,
            elements: ElementsConfig::default(),
        }
    }

    pub fn with_strategy_factory(mut self, factory: Rc<dyn StrategyFactory>) -> Self {
        self.strategy_factory = Some(factory);
        self
    }

    pub fn with_lifecycle_registry(mut self, registry: Rc<LifecycleRegistry>) -> Self {
        self.lifecycle = Some(registry);
        self
    }

    pub fn with_elements_config(mut self, elements: ElementsConfig) -> Self {
        self.elements = elements;
        self
    }
}

impl fmt::Debug for NgElementConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NgElementConfig")
            .field("injector", &self.injector)
            .field("custom_strategy", &self.strategy_factory.is_some())
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

/// Data shared by every instance of one element class
struct ElementClass {
    selector: String,
    inputs: Vec<InputDef>,
    attribute_inputs: HashMap<String, InputDef>,
    observed_attributes: Vec<String>,
    injector: Rc<Injector>,
    strategy_factory: Rc<dyn StrategyFactory>,
    lifecycle: Option<Rc<LifecycleRegistry>>,
}

impl ElementClass {
    fn input(&self, prop_name: &str) -> Option<&InputDef> {
        self.inputs.iter().find(|i| i.prop_name == prop_name)
    }
}

/// Build a custom element class backed by `component`.
///
/// The component's metadata is resolved here, once; a selector that is not a
/// valid custom element name is rejected.
pub fn create_custom_element(
    component: ComponentType,
    config: NgElementConfig,
) -> Result<Rc<NgElementConstructor>> {
    let factory = resolve_component_factory(component, &config.injector)?;
    let definition = factory.definition();

    validate_name(&definition.selector).map_err(|source| ElementsError::InvalidElementName {
        component: component.name(),
        source,
    })?;

    let strategy_factory = match config.strategy_factory {
        Some(strategy_factory) => strategy_factory,
        None => Rc::new(
            ComponentStrategyFactory::from_factory(factory.clone()).with_config(config.elements),
        ),
    };

    let class = ElementClass {
        selector: definition.selector.clone(),
        inputs: definition.inputs.clone(),
        attribute_inputs: definition.attribute_inputs(),
        observed_attributes: definition.observed_attributes(),
        injector: config.injector,
        strategy_factory,
        lifecycle: config.lifecycle,
    };
    tracing::debug!(
        "Created element class <{}> ({} inputs, observing {:?})",
        class.selector,
        class.inputs.len(),
        class.observed_attributes
    );

    Ok(Rc::new(NgElementConstructor {
        class: Rc::new(class),
    }))
}

/// Custom element class produced by [`create_custom_element`]
pub struct NgElementConstructor {
    class: Rc<ElementClass>,
}

impl NgElementConstructor {
    /// Tag name the class is meant to be registered under
    pub fn selector(&self) -> &str {
        &self.class.selector
    }

    /// Input property names, in declaration order
    pub fn input_names(&self) -> Vec<&str> {
        self.class.inputs.iter().map(|i| i.prop_name.as_str()).collect()
    }

    /// Register the class in `document` under its selector
    pub fn define(self: &Rc<Self>, document: &Document) -> Result<()> {
        document.define_element(&self.class.selector, self.clone())?;
        Ok(())
    }

    /// Create an element instance for `host`
    pub fn create(&self, host: ElementRef) -> Rc<NgElement> {
        Rc::new(NgElement {
            host,
            class: self.class.clone(),
            strategy: RefCell::new(None),
            events_subscription: RefCell::new(None),
        })
    }
}

impl CustomElementConstructor for NgElementConstructor {
    fn observed_attributes(&self) -> Vec<String> {
        self.class.observed_attributes.clone()
    }

    fn construct(&self, host: ElementRef) -> Rc<dyn CustomElementReactions> {
        self.create(host)
    }
}

impl fmt::Debug for NgElementConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NgElementConstructor")
            .field("selector", &self.class.selector)
            .field("observed_attributes", &self.class.observed_attributes)
            .finish_non_exhaustive()
    }
}

/// One component-backed element instance
pub struct NgElement {
    host: ElementRef,
    class: Rc<ElementClass>,
    strategy: RefCell<Option<Rc<dyn ElementStrategy>>>,
    events_subscription: RefCell<Option<Subscription>>,
}

impl NgElement {
    pub fn host(&self) -> &ElementRef {
        &self.host
    }

    pub fn has_strategy(&self) -> bool {
        self.strategy.borrow().is_some()
    }

    /// The element's strategy, created on first use
    pub fn strategy(&self) -> Rc<dyn ElementStrategy> {
        if let Some(strategy) = self.strategy.borrow().as_ref() {
            return strategy.clone();
        }

        let strategy = self.class.strategy_factory.create(self.class.injector.clone());
        *self.strategy.borrow_mut() = Some(strategy.clone());

        // Properties written before the upgrade shadow the accessors
        for input in &self.class.inputs {
            if let Some(value) = self.host.take_own_property(&input.prop_name) {
                strategy.set_input_value(&input.prop_name, value, input.transform.as_ref());
            }
        }
        strategy
    }

    pub fn attribute_changed_callback(
        &self,
        attr_name: &str,
        _old_value: Option<&str>,
        new_value: Option<&str>,
        _namespace: Option<&str>,
    ) {
        let Some(input) = self.class.attribute_inputs.get(attr_name) else {
            return;
        };
        self.strategy().set_input_value(
            &input.prop_name,
            Value::from(new_value.map(str::to_string)),
            input.transform.as_ref(),
        );
    }

    pub fn connected_callback(&self) -> Result<()> {
        let strategy = self.strategy();

        // Subscribe early when the stream already exists so that outputs
        // emitted during creation are seen
        let subscribed_early = match strategy.events() {
            Some(events) => {
                self.subscribe_to_events(&events);
                true
            }
            None => false,
        };

        if let Err(err) = strategy.connect(&self.host) {
            drop(self.events_subscription.take());
            return Err(err);
        }

        if !subscribed_early {
            if let Some(events) = strategy.events() {
                self.subscribe_to_events(&events);
            }
        }

        self.notify(|tag, node| LifecycleEvent::Connected { tag, node });
        Ok(())
    }

    pub fn disconnected_callback(&self) {
        let strategy = self.strategy.borrow().clone();
        if let Some(strategy) = strategy {
            strategy.disconnect();
        }
        drop(self.events_subscription.take());

        self.notify(|tag, node| LifecycleEvent::Disconnected { tag, node });
    }

    /// Input accessor read; `None` for names that are not inputs
    pub fn get_input(&self, prop_name: &str) -> Option<Value> {
        self.class.input(prop_name)?;
        Some(self.strategy().input_value(prop_name))
    }

    /// Input accessor write; false for names that are not inputs
    pub fn set_input(&self, prop_name: &str, value: Value) -> bool {
        let Some(input) = self.class.input(prop_name) else {
            return false;
        };
        self.strategy()
            .set_input_value(prop_name, value, input.transform.as_ref());
        true
    }

    fn subscribe_to_events(&self, events: &EventBridge) {
        let host = self.host.clone();
        let subscription = events.subscribe(move |event| {
            host.dispatch_event(CustomEvent::new(&event.name, event.value.clone()));
        });
        let previous = self.events_subscription.replace(Some(subscription));
        drop(previous);
    }

    fn notify(&self, event: impl FnOnce(String, fos_dom::NodeId) -> LifecycleEvent) {
        if let Some(lifecycle) = &self.class.lifecycle {
            lifecycle.notify(event(self.class.selector.clone(), self.host.id()));
        }
    }
}

impl CustomElementReactions for NgElement {
    fn connected_callback(&self) -> std::result::Result<(), CallbackError> {
        NgElement::connected_callback(self).map_err(Into::into)
    }

    fn disconnected_callback(&self) -> std::result::Result<(), CallbackError> {
        NgElement::disconnected_callback(self);
        Ok(())
    }

    fn attribute_changed_callback(
        &self,
        name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        namespace: Option<&str>,
    ) -> std::result::Result<(), CallbackError> {
        NgElement::attribute_changed_callback(self, name, old_value, new_value, namespace);
        Ok(())
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.get_input(name)
    }

    fn set_property(&self, name: &str, value: Value) -> bool {
        self.set_input(name, value)
    }

    fn property_names(&self) -> Vec<String> {
        self.class.inputs.iter().map(|i| i.prop_name.clone()).collect()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl fmt::Debug for NgElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NgElement")
            .field("selector", &self.class.selector)
            .field("host", &self.host)
            .field("has_strategy", &self.has_strategy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentFactoryResolver;
    use crate::definition::ComponentDefinition;
    use crate::platform::{Application, ComponentDescriptor, ComponentRegistry, root_injector};
    use std::cell::Cell;

    struct Loose;
    struct Named;

    struct Blank;

    impl crate::Component for Blank {
        fn set_input(&self, _prop_name: &str, _value: Value) {}

        fn input(&self, _prop_name: &str) -> Value {
            Value::Undefined
        }
    }

    /// Strategy that records the calls it receives
    #[derive(Default)]
    struct RecordingStrategy {
        calls: RefCell<Vec<String>>,
        values: RefCell<HashMap<String, Value>>,
        with_events: bool,
        events: EventBridge,
    }

    impl ElementStrategy for RecordingStrategy {
        fn connect(&self, _host: &ElementRef) -> Result<()> {
            self.calls.borrow_mut().push("connect".to_string());
            Ok(())
        }

        fn disconnect(&self) {
            self.calls.borrow_mut().push("disconnect".to_string());
        }

        fn input_value(&self, prop_name: &str) -> Value {
            self.values.borrow().get(prop_name).cloned().unwrap_or_default()
        }

        fn set_input_value(&self, prop_name: &str, value: Value, transform: Option<&crate::InputTransform>) {
            let value = match transform {
                Some(t) => t(value),
                None => value,
            };
            self.calls.borrow_mut().push(format!("set {prop_name}={value:?}"));
            self.values.borrow_mut().insert(prop_name.to_string(), value);
        }

        fn events(&self) -> Option<EventBridge> {
            self.with_events.then(|| self.events.clone())
        }
    }

    struct RecordingFactory {
        created: Cell<usize>,
        last: RefCell<Option<Rc<RecordingStrategy>>>,
    }

    impl StrategyFactory for RecordingFactory {
        fn create(&self, _injector: Rc<Injector>) -> Rc<dyn ElementStrategy> {
            self.created.set(self.created.get() + 1);
            let strategy = Rc::new(RecordingStrategy {
                with_events: true,
                ..RecordingStrategy::default()
            });
            *self.last.borrow_mut() = Some(strategy.clone());
            strategy
        }
    }

    fn registry_with(selector: &str) -> ComponentRegistry {
        let definition = ComponentDefinition::new(selector)
            .with_input(InputDef::new("userName"))
            .with_input(InputDef::new("count").with_transform(|v| match v.as_str() {
                Some(s) => Value::from(s.parse::<f64>().unwrap_or(f64::NAN)),
                None => v,
            }));
        let mut registry = ComponentRegistry::new();
        registry.register(
            ComponentType::of::<Named>(),
            Rc::new(ComponentDescriptor::new(definition, |_| Ok(Blank))),
        );
        registry
    }

    fn recording_config(selector: &str) -> (NgElementConfig, Rc<RecordingFactory>) {
        let resolver: Rc<dyn ComponentFactoryResolver> = Rc::new(registry_with(selector));
        let injector = root_injector(resolver, Rc::new(Application::new()));
        let factory = Rc::new(RecordingFactory {
            created: Cell::new(0),
            last: RefCell::new(None),
        });
        let config = NgElementConfig::new(injector).with_strategy_factory(factory.clone());
        (config, factory)
    }

    #[test]
    fn test_unregistered_component() {
        let (config, _) = recording_config("x-named");
        let err = create_custom_element(ComponentType::of::<Loose>(), config).unwrap_err();
        assert!(matches!(err, ElementsError::UnresolvedComponent(_)));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let (config, _) = recording_config("named");
        let err = create_custom_element(ComponentType::of::<Named>(), config).unwrap_err();
        assert!(matches!(err, ElementsError::InvalidElementName { .. }));
    }

    #[test]
    fn test_observed_attributes() {
        let (config, _) = recording_config("x-named");
        let class = create_custom_element(ComponentType::of::<Named>(), config).unwrap();
        assert_eq!(class.selector(), "x-named");
        assert_eq!(CustomElementConstructor::observed_attributes(&*class), vec!["user-name", "count"]);
        assert_eq!(class.input_names(), vec!["userName", "count"]);
    }

    #[test]
    fn test_strategy_is_lazy_and_single() {
        let (config, factory) = recording_config("x-named");
        let class = create_custom_element(ComponentType::of::<Named>(), config).unwrap();
        let doc = Document::default();
        let element = class.create(doc.element(doc.create_element("x-named")));
        assert!(!element.has_strategy());

        element.attribute_changed_callback("unrelated", None, Some("1"), None);
        assert!(!element.has_strategy());

        element.attribute_changed_callback("count", None, Some("3"), None);
        element.connected_callback().unwrap();
        element.disconnected_callback();
        assert_eq!(factory.created.get(), 1);

        let strategy = factory.last.borrow().clone().unwrap();
        assert_eq!(
            *strategy.calls.borrow(),
            vec!["set count=3".to_string(), "connect".to_string(), "disconnect".to_string()]
        );
    }

    #[test]
    fn test_disconnect_without_strategy_is_noop() {
        let (config, factory) = recording_config("x-named");
        let class = create_custom_element(ComponentType::of::<Named>(), config).unwrap();
        let doc = Document::default();
        let element = class.create(doc.element(doc.create_element("x-named")));

        element.disconnected_callback();
        assert_eq!(factory.created.get(), 0);
    }

    #[test]
    fn test_attribute_removal_writes_null() {
        let (config, factory) = recording_config("x-named");
        let class = create_custom_element(ComponentType::of::<Named>(), config).unwrap();
        let doc = Document::default();
        let element = class.create(doc.element(doc.create_element("x-named")));

        element.attribute_changed_callback("user-name", Some("a"), None, None);
        let strategy = factory.last.borrow().clone().unwrap();
        assert_eq!(strategy.input_value("userName"), Value::Null);
    }

    #[test]
    fn test_own_properties_replayed_through_accessors() {
        let (config, factory) = recording_config("x-named");
        let class = create_custom_element(ComponentType::of::<Named>(), config).unwrap();
        let doc = Document::default();
        let host = doc.create_element("x-named");
        doc.set_property(host, "userName", Value::from("early")).unwrap();
        doc.set_property(host, "other", Value::from(1)).unwrap();

        let element = class.create(doc.element(host));
        assert_eq!(element.get_input("userName"), Some(Value::from("early")));
        assert!(!doc.has_own_property(host, "userName"));
        assert!(doc.has_own_property(host, "other"));
        assert_eq!(element.get_input("other"), None);

        let strategy = factory.last.borrow().clone().unwrap();
        assert_eq!(strategy.calls.borrow()[0], "set userName=\"early\"");
    }

    #[test]
    fn test_strategy_events_dispatched_on_host() {
        let (config, factory) = recording_config("x-named");
        let class = create_custom_element(ComponentType::of::<Named>(), config).unwrap();
        let doc = Document::default();
        let host = doc.element(doc.create_element("x-named"));
        let element = class.create(host.clone());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        host.add_event_listener("save", move |e| {
            s.borrow_mut().push((e.detail.clone(), e.bubbles, e.cancelable));
        });

        element.connected_callback().unwrap();
        let strategy = factory.last.borrow().clone().unwrap();
        let output: crate::EventEmitter = crate::EventEmitter::new();
        strategy.events.bind(vec![("save".to_string(), output.clone())]);

        output.emit(Value::from(7));
        element.disconnected_callback();
        output.emit(Value::from(8));

        assert_eq!(*seen.borrow(), vec![(Value::from(7), false, false)]);
    }
}
