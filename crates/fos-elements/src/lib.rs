//! fOS Elements - components as custom elements
//!
//! Wraps a reactive component type in a custom element class. The element's
//! lifecycle callbacks, observed attributes and input properties drive one
//! component instance through an [`ElementStrategy`]; component outputs are
//! re-dispatched on the host as [`fos_dom::CustomEvent`]s.
//!
//! ```text
//! Document --reactions--> NgElement --strategy--> ComponentStrategy
//!                                                   |   |    |
//!                                    ComponentFactory   |    EventBridge
//!                                                    Scheduler
//! ```

mod config;
mod error;
pub mod component;
pub mod definition;
pub mod element;
pub mod emitter;
pub mod events;
pub mod injector;
pub mod lifecycle;
pub mod platform;
pub mod projection;
pub mod scheduler;
pub mod strategy;
pub mod strategy_factory;

pub use config::{DESTROY_DELAY, ElementsConfig, FRAME_FALLBACK_DELAY};
pub use error::{ElementsError, Result};
pub use component::{
    ApplicationRef, Component, ComponentFactory, ComponentFactoryResolver, ComponentRef,
    SimpleChange, SimpleChanges, ViewRef,
};
pub use definition::{
    ComponentDefinition, ComponentType, InputDef, InputTransform, OutputDef, camel_to_dash_case,
};
pub use element::{NgElement, NgElementConfig, NgElementConstructor, create_custom_element};
pub use emitter::{EventEmitter, Subscription};
pub use events::{EventBridge, StrategyEvent};
pub use injector::Injector;
pub use lifecycle::{LifecycleEvent, LifecycleRegistry};
pub use platform::{Application, ComponentContext, ComponentDescriptor, ComponentRegistry, root_injector};
pub use projection::extract_projectable_nodes;
pub use scheduler::{Cancel, Scheduler};
pub use strategy::{ComponentStrategy, ElementStrategy, StrategyPhase};
pub use strategy_factory::{ComponentStrategyFactory, StrategyFactory, resolve_component_factory};
