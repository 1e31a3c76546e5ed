//! In-process component platform
//!
//! A minimal framework behind the collaborator traits: a type-keyed factory
//! registry, closure-built components with a host view that renders on each
//! detection pass, and an application holding the attached views.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_dom::{ElementRef, NodeId};

use crate::component::{
    ApplicationRef, Component, ComponentFactory, ComponentFactoryResolver, ComponentRef, ViewRef,
};
use crate::definition::{ComponentDefinition, ComponentType};
use crate::injector::Injector;

/// Root injector providing `resolver` and `app`
pub fn root_injector(
    resolver: Rc<dyn ComponentFactoryResolver>,
    app: Rc<dyn ApplicationRef>,
) -> Rc<Injector> {
    Rc::new(
        Injector::new()
            .provide::<dyn ComponentFactoryResolver>(resolver)
            .provide::<dyn ApplicationRef>(app),
    )
}

/// Everything a component constructor receives
pub struct ComponentContext<'a> {
    pub injector: &'a Rc<Injector>,
    pub host: &'a ElementRef,
    /// One bucket per content selector
    pub projectable_nodes: &'a [Vec<NodeId>],
}

type Constructor = Box<dyn Fn(&ComponentContext<'_>) -> anyhow::Result<Rc<dyn Component>>>;

/// Component type description: metadata plus a constructor
pub struct ComponentDescriptor {
    definition: ComponentDefinition,
    constructor: Constructor,
}

impl ComponentDescriptor {
    pub fn new<C, F>(definition: ComponentDefinition, constructor: F) -> Self
    where
        C: Component + 'static,
        F: Fn(&ComponentContext<'_>) -> anyhow::Result<C> + 'static,
    {
        Self {
            definition,
            constructor: Box::new(move |cx: &ComponentContext<'_>| {
                let instance: Rc<dyn Component> = Rc::new(constructor(cx)?);
                Ok(instance)
            }),
        }
    }
}

impl ComponentFactory for ComponentDescriptor {
    fn definition(&self) -> &ComponentDefinition {
        &self.definition
    }

    fn create(
        &self,
        injector: Rc<Injector>,
        projectable_nodes: Vec<Vec<NodeId>>,
        host: &ElementRef,
    ) -> anyhow::Result<Rc<dyn ComponentRef>> {
        let cx = ComponentContext {
            injector: &injector,
            host,
            projectable_nodes: &projectable_nodes,
        };
        let instance = (self.constructor)(&cx)?;
        Ok(Rc::new(HostComponentRef {
            view: Rc::new(HostView::new(instance.clone())),
            instance,
            destroyed: Cell::new(false),
        }))
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// View rendering one component instance
pub struct HostView {
    instance: Rc<dyn Component>,
    dirty: Cell<bool>,
    destroyed: Cell<bool>,
}

impl HostView {
    fn new(instance: Rc<dyn Component>) -> Self {
        Self {
            instance,
            dirty: Cell::new(true),
            destroyed: Cell::new(false),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

impl ViewRef for HostView {
    fn detect_changes(&self) {
        if self.destroyed.get() {
            return;
        }
        self.instance.render();
        self.dirty.set(false);
    }

    fn mark_for_check(&self) {
        self.dirty.set(true);
    }
}

struct HostComponentRef {
    instance: Rc<dyn Component>,
    view: Rc<HostView>,
    destroyed: Cell<bool>,
}

impl ComponentRef for HostComponentRef {
    fn instance(&self) -> Rc<dyn Component> {
        self.instance.clone()
    }

    fn host_view(&self) -> Rc<dyn ViewRef> {
        self.view.clone()
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.view.destroyed.set(true);
        self.instance.on_destroy();
    }
}

/// Component factories keyed by component type
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<ComponentType, Rc<dyn ComponentFactory>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: ComponentType, factory: Rc<dyn ComponentFactory>) {
        tracing::trace!("Registered {} as <{}>", component.name(), factory.definition().selector);
        self.factories.insert(component, factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl ComponentFactoryResolver for ComponentRegistry {
    fn resolve_component_factory(&self, component: ComponentType) -> Option<Rc<dyn ComponentFactory>> {
        self.factories.get(&component).cloned()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.factories.len())
            .finish()
    }
}

/// Application holding the views included in application-wide detection
#[derive(Default)]
pub struct Application {
    views: RefCell<Vec<Rc<dyn ViewRef>>>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run change detection over every attached view
    pub fn tick(&self) -> usize {
        let views = self.views.borrow().clone();
        for view in &views {
            view.detect_changes();
        }
        views.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.borrow().len()
    }
}

impl ApplicationRef for Application {
    fn attach_view(&self, view: Rc<dyn ViewRef>) {
        self.views.borrow_mut().push(view);
    }

    fn detach_view(&self, view: &Rc<dyn ViewRef>) {
        self.views.borrow_mut().retain(|v| !Rc::ptr_eq(v, view));
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("views", &self.view_count())
            .finish()
    }
}
