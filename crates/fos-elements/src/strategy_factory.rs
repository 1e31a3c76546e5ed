//! Strategy factories

use std::rc::Rc;

use crate::component::{ComponentFactory, ComponentFactoryResolver};
use crate::config::ElementsConfig;
use crate::definition::{ComponentDefinition, ComponentType};
use crate::error::{ElementsError, Result};
use crate::injector::Injector;
use crate::strategy::{ComponentStrategy, ElementStrategy};

/// Produces one strategy per element instance
pub trait StrategyFactory {
    fn create(&self, injector: Rc<Injector>) -> Rc<dyn ElementStrategy>;
}

/// Look up the factory for `component` through the injector's resolver
pub fn resolve_component_factory(
    component: ComponentType,
    injector: &Injector,
) -> Result<Rc<dyn ComponentFactory>> {
    let resolver = injector.require::<dyn ComponentFactoryResolver>()?;
    resolver
        .resolve_component_factory(component)
        .ok_or(ElementsError::UnresolvedComponent(component.name()))
}

/// Creates [`ComponentStrategy`] instances for one component type.
///
/// The component factory is resolved once and shared by every strategy.
pub struct ComponentStrategyFactory {
    factory: Rc<dyn ComponentFactory>,
    config: ElementsConfig,
}

impl ComponentStrategyFactory {
    pub fn new(component: ComponentType, injector: &Injector) -> Result<Self> {
        Ok(Self::from_factory(resolve_component_factory(component, injector)?))
    }

    pub fn from_factory(factory: Rc<dyn ComponentFactory>) -> Self {
        Self {
            factory,
            config: ElementsConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ElementsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn definition(&self) -> &ComponentDefinition {
        self.factory.definition()
    }
}

impl StrategyFactory for ComponentStrategyFactory {
    fn create(&self, injector: Rc<Injector>) -> Rc<dyn ElementStrategy> {
        ComponentStrategy::new(self.factory.clone(), injector, self.config)
    }
}
