//! Dependency injection
//!
//! Hierarchical provider container. Lookups walk from the child towards the
//! root. Injectors are not mutated once shared.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{ElementsError, Result};

/// Provider container keyed by type
#[derive(Default)]
pub struct Injector {
    parent: Option<Rc<Injector>>,
    providers: HashMap<TypeId, Box<dyn Any>>,
}

impl Injector {
    /// Root injector without providers
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty injector delegating to `parent`
    pub fn child(parent: &Rc<Injector>) -> Self {
        Self {
            parent: Some(parent.clone()),
            providers: HashMap::new(),
        }
    }

    /// Register `value` as the provider for `T`, replacing any previous one
    pub fn provide<T: ?Sized + 'static>(mut self, value: Rc<T>) -> Self {
        self.providers.insert(TypeId::of::<T>(), Box::new(value));
        self
    }

    /// Provider for `T`, looked up through the parent chain
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Rc<T>> {
        self.providers
            .get(&TypeId::of::<T>())
            .and_then(|p| p.downcast_ref::<Rc<T>>())
            .cloned()
            .or_else(|| self.parent.as_ref().and_then(|p| p.get::<T>()))
    }

    /// Like [`Injector::get`], failing when nothing provides `T`
    pub fn require<T: ?Sized + 'static>(&self) -> Result<Rc<T>> {
        self.get::<T>()
            .ok_or(ElementsError::MissingProvider(std::any::type_name::<T>()))
    }

    pub fn parent(&self) -> Option<&Rc<Injector>> {
        self.parent.as_ref()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.providers.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
