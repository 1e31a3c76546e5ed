//! Document - High-level document API
//!
//! The document owns the node tree, event listeners and the custom element
//! registry, and runs custom element reactions synchronously after each
//! mutation. No internal borrow is held while script-side code (element
//! constructors, reactions, listeners) runs, so that code may freely re-enter
//! the document.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::custom_elements::{
    CallbackError, CustomElementConstructor, CustomElementError, CustomElementReactions,
    CustomElementRegistry, LifecycleCallback,
};
use crate::dom_events::{CustomEvent, EventListeners, ListenerId};
use crate::selector::{SelectorError, SelectorList};
use crate::{DomError, DomTree, EventLoop, Node, NodeId, NodeType, Value};

/// HTML Document
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

struct DocumentInner {
    url: String,
    tree: RefCell<DomTree>,
    listeners: RefCell<EventListeners>,
    registry: RefCell<CustomElementRegistry>,
    instances: RefCell<HashMap<NodeId, Rc<dyn CustomElementReactions>>>,
    reaction_errors: RefCell<Vec<ReactionError>>,
    event_loop: EventLoop,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a new document with `<html><head/><body/></html>`
    pub fn new(url: &str) -> Self {
        Self::with_event_loop(url, EventLoop::new())
    }

    /// Create a document bound to the given window event loop
    pub fn with_event_loop(url: &str, event_loop: EventLoop) -> Self {
        let mut tree = DomTree::new();

        // Create basic document structure
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        let built = tree
            .append_child(tree.root(), html)
            .and_then(|_| tree.append_child(html, head))
            .and_then(|_| tree.append_child(html, body));
        debug_assert!(built.is_ok());

        Self {
            inner: Rc::new(DocumentInner {
                url: url.to_string(),
                tree: RefCell::new(tree),
                listeners: RefCell::new(EventListeners::new()),
                registry: RefCell::new(CustomElementRegistry::new()),
                instances: RefCell::new(HashMap::new()),
                reaction_errors: RefCell::new(Vec::new()),
                event_loop,
                html_element: html,
                head_element: head,
                body_element: body,
            }),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The window's event loop
    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.inner.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.inner.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.inner.body_element
    }

    /// Handle to an element of this document
    pub fn element(&self, id: NodeId) -> ElementRef {
        ElementRef {
            doc: self.clone(),
            id,
        }
    }

    /// Whether two handles refer to the same document
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create an element; defined custom elements are constructed right away
    pub fn create_element(&self, tag: &str) -> NodeId {
        let id = self.inner.tree.borrow_mut().push(Node::element(tag));
        let constructor = self.definition_for(id).map(|(_, ctor)| ctor);
        if let Some(constructor) = constructor {
            let instance = constructor.construct(self.element(id));
            self.inner.instances.borrow_mut().insert(id, instance);
        }
        id
    }

    pub fn create_text_node(&self, content: &str) -> NodeId {
        self.inner.tree.borrow_mut().create_text(content)
    }

    pub fn create_comment(&self, content: &str) -> NodeId {
        self.inner.tree.borrow_mut().create_comment(content)
    }

    // ------------------------------------------------------------------
    // Tree queries
    // ------------------------------------------------------------------

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.inner.tree.borrow().get(id).map(Node::node_type)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.node_type(id) == Some(NodeType::Element)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .get(id)
            .and_then(Node::as_element)
            .map(|e| e.tag.clone())
    }

    /// Text of a text or comment node
    pub fn node_value(&self, id: NodeId) -> Option<String> {
        let tree = self.inner.tree.borrow();
        match &tree.get(id)?.data {
            crate::NodeData::Text(t) | crate::NodeData::Comment(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> NodeId {
        self.inner.tree.borrow().parent(id)
    }

    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.inner
            .tree
            .borrow()
            .children(id)
            .map(|(child, _)| child)
            .collect()
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.inner.tree.borrow().is_connected(id)
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.inner.tree.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tree.borrow().is_empty()
    }

    /// Match an element against a parsed selector list; non-elements never match
    pub fn matches(&self, id: NodeId, selector: &SelectorList) -> bool {
        self.inner
            .tree
            .borrow()
            .get(id)
            .and_then(Node::as_element)
            .is_some_and(|e| selector.matches(e))
    }

    /// `element.matches(selector)`
    pub fn matches_selector(&self, id: NodeId, selector: &str) -> Result<bool, SelectorError> {
        let list = SelectorList::parse(selector)?;
        Ok(self.matches(id, &list))
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, NodeId::NONE)
    }

    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        let removed = self.connected_instances(child);
        self.inner
            .tree
            .borrow_mut()
            .insert_before(parent, child, reference)?;

        for (node, instance) in removed {
            self.report(node, LifecycleCallback::Disconnected, instance.disconnected_callback());
        }
        self.after_insert(child);
        Ok(())
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let removed = self.connected_instances(child);
        self.inner.tree.borrow_mut().remove_child(parent, child)?;

        for (node, instance) in removed {
            self.report(node, LifecycleCallback::Disconnected, instance.disconnected_callback());
        }
        Ok(())
    }

    /// Upgraded elements in the subtree of `id`, if it is currently connected
    fn connected_instances(&self, id: NodeId) -> Vec<(NodeId, Rc<dyn CustomElementReactions>)> {
        let tree = self.inner.tree.borrow();
        if !tree.is_connected(id) {
            return Vec::new();
        }
        let instances = self.inner.instances.borrow();
        tree.subtree(id)
            .into_iter()
            .filter_map(|node| instances.get(&node).map(|i| (node, i.clone())))
            .collect()
    }

    fn after_insert(&self, id: NodeId) {
        let nodes = {
            let tree = self.inner.tree.borrow();
            if !tree.is_connected(id) {
                return;
            }
            tree.subtree(id)
        };

        for node in nodes {
            let instance = self.inner.instances.borrow().get(&node).cloned();
            match instance {
                Some(instance) => {
                    self.report(node, LifecycleCallback::Connected, instance.connected_callback());
                }
                None => self.upgrade(node),
            }
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .get(id)
            .and_then(Node::as_element)
            .and_then(|e| e.get_attr(name))
            .map(str::to_string)
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let elem = tree
                .get_mut(id)
                .ok_or(DomError::NotFound(id))?
                .as_element_mut()
                .ok_or(DomError::NotAnElement(id))?;
            elem.set_attr(&name, value)
        };
        self.attribute_changed(id, &name, old.as_deref(), Some(value));
        Ok(())
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let elem = tree
                .get_mut(id)
                .ok_or(DomError::NotFound(id))?
                .as_element_mut()
                .ok_or(DomError::NotAnElement(id))?;
            elem.remove_attr(&name)
        };
        if old.is_some() {
            self.attribute_changed(id, &name, old.as_deref(), None);
        }
        Ok(())
    }

    fn attribute_changed(&self, id: NodeId, name: &str, old: Option<&str>, new: Option<&str>) {
        let Some(instance) = self.inner.instances.borrow().get(&id).cloned() else {
            return;
        };
        let observed = self
            .definition_for(id)
            .is_some_and(|(observed, _)| observed.iter().any(|a| a == name));
        if observed {
            let result = instance.attribute_changed_callback(name, old, new, None);
            self.report(id, LifecycleCallback::AttributeChanged, result);
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// `element[name]`: class accessors first, then own properties
    pub fn get_property(&self, id: NodeId, name: &str) -> Value {
        if let Some(instance) = self.custom_element(id) {
            if let Some(value) = instance.get_property(name) {
                return value;
            }
        }
        self.inner
            .tree
            .borrow()
            .get(id)
            .and_then(Node::as_element)
            .and_then(|e| e.properties.get(name).cloned())
            .unwrap_or_default()
    }

    /// `element[name] = value`
    pub fn set_property(&self, id: NodeId, name: &str, value: Value) -> Result<(), DomError> {
        if let Some(instance) = self.custom_element(id) {
            if instance.set_property(name, value.clone()) {
                return Ok(());
            }
        }
        self.with_element_mut(id, |e| {
            e.properties.insert(name.to_string(), value);
        })
    }

    /// Whether `name` is an own (expando) property of the element
    pub fn has_own_property(&self, id: NodeId, name: &str) -> bool {
        self.inner
            .tree
            .borrow()
            .get(id)
            .and_then(Node::as_element)
            .is_some_and(|e| e.properties.contains_key(name))
    }

    /// `delete element[name]`, returning the removed own property
    pub fn take_own_property(&self, id: NodeId, name: &str) -> Option<Value> {
        self.inner
            .tree
            .borrow_mut()
            .get_mut(id)
            .and_then(Node::as_element_mut)
            .and_then(|e| e.properties.remove(name))
    }

    fn with_element_mut(
        &self,
        id: NodeId,
        f: impl FnOnce(&mut crate::ElementData),
    ) -> Result<(), DomError> {
        let mut tree = self.inner.tree.borrow_mut();
        let elem = tree
            .get_mut(id)
            .ok_or(DomError::NotFound(id))?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(id))?;
        f(elem);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(
        &self,
        id: NodeId,
        event_type: &str,
        listener: impl Fn(&mut CustomEvent) + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .borrow_mut()
            .add(id, event_type, Rc::new(listener))
    }

    pub fn remove_event_listener(&self, listener: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(listener)
    }

    /// Dispatch an event at `target`, bubbling through ancestors if requested.
    ///
    /// Returns false if a listener prevented the default action.
    pub fn dispatch_event(&self, target: NodeId, mut event: CustomEvent) -> bool {
        event.target = target;
        let path = {
            let tree = self.inner.tree.borrow();
            let mut path = vec![target];
            if event.bubbles {
                let mut current = tree.parent(target);
                while current.is_valid() {
                    path.push(current);
                    current = tree.parent(current);
                }
            }
            path
        };

        for node in path {
            event.current_target = node;
            let listeners = self.inner.listeners.borrow().snapshot(node, &event.event_type);
            for listener in listeners {
                listener(&mut event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }

        !event.is_default_prevented()
    }

    // ------------------------------------------------------------------
    // Custom elements
    // ------------------------------------------------------------------

    /// `customElements.define(name, constructor)`
    ///
    /// Connected elements already carrying the tag are upgraded in tree order.
    pub fn define_element(
        &self,
        name: &str,
        constructor: Rc<dyn CustomElementConstructor>,
    ) -> Result<(), CustomElementError> {
        self.inner.registry.borrow_mut().define(name, constructor)?;
        tracing::debug!("Defined custom element <{}>", name);

        let candidates: Vec<NodeId> = {
            let tree = self.inner.tree.borrow();
            tree.subtree(tree.root())
                .into_iter()
                .filter(|id| {
                    tree.get(*id)
                        .and_then(Node::as_element)
                        .is_some_and(|e| e.tag == name)
                })
                .collect()
        };
        for id in candidates {
            self.upgrade(id);
        }
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.registry.borrow().is_defined(name)
    }

    /// Observed attributes and constructor for the element's tag, if defined
    fn definition_for(&self, id: NodeId) -> Option<(Vec<String>, Rc<dyn CustomElementConstructor>)> {
        let tag = self.tag_name(id)?;
        let registry = self.inner.registry.borrow();
        let def = registry.get(&tag)?;
        Some((def.observed_attributes.clone(), def.constructor.clone()))
    }

    /// Upgrade an element whose tag is defined and which has no instance yet
    fn upgrade(&self, id: NodeId) {
        if self.inner.instances.borrow().contains_key(&id) {
            return;
        }
        let Some((observed, constructor)) = self.definition_for(id) else {
            return;
        };

        let instance = constructor.construct(self.element(id));
        self.inner.instances.borrow_mut().insert(id, instance.clone());
        tracing::debug!("Upgraded {:?} to <{}>", id, self.tag_name(id).unwrap_or_default());

        let attrs: Vec<(String, String)> = {
            let tree = self.inner.tree.borrow();
            tree.get(id)
                .and_then(Node::as_element)
                .map(|e| {
                    e.attrs
                        .iter()
                        .filter(|a| observed.contains(&a.name))
                        .map(|a| (a.name.clone(), a.value.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };
        for (name, value) in attrs {
            let result = instance.attribute_changed_callback(&name, None, Some(&value), None);
            self.report(id, LifecycleCallback::AttributeChanged, result);
        }

        if self.is_connected(id) {
            self.report(id, LifecycleCallback::Connected, instance.connected_callback());
        }
    }

    /// The custom element instance backing a node
    pub fn custom_element(&self, id: NodeId) -> Option<Rc<dyn CustomElementReactions>> {
        self.inner.instances.borrow().get(&id).cloned()
    }

    /// The custom element instance backing a node, downcast to its class
    pub fn custom_element_as<T: Any>(&self, id: NodeId) -> Option<Rc<T>> {
        self.custom_element(id)?.into_any().downcast::<T>().ok()
    }

    /// Errors raised by reactions since the last call
    pub fn take_reaction_errors(&self) -> Vec<ReactionError> {
        std::mem::take(&mut *self.inner.reaction_errors.borrow_mut())
    }

    fn report(&self, id: NodeId, callback: LifecycleCallback, result: Result<(), CallbackError>) {
        if let Err(source) = result {
            let tag = self.tag_name(id).unwrap_or_default();
            tracing::error!("{:?} reaction for <{}> failed: {}", callback, tag, source);
            self.inner.reaction_errors.borrow_mut().push(ReactionError {
                callback,
                node: id,
                tag,
                source,
            });
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.inner.url)
            .field("nodes", &self.len())
            .finish_non_exhaustive()
    }
}

/// An error reported by a custom element reaction
#[derive(Debug)]
pub struct ReactionError {
    pub callback: LifecycleCallback,
    pub node: NodeId,
    pub tag: String,
    pub source: CallbackError,
}

impl fmt::Display for ReactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} reaction for <{}> failed: {}", self.callback, self.tag, self.source)
    }
}

impl std::error::Error for ReactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Handle to one element (`HTMLElement`)
#[derive(Clone)]
pub struct ElementRef {
    doc: Document,
    id: NodeId,
}

impl ElementRef {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn tag_name(&self) -> Option<String> {
        self.doc.tag_name(self.id)
    }

    pub fn child_nodes(&self) -> Vec<NodeId> {
        self.doc.child_nodes(self.id)
    }

    pub fn is_connected(&self) -> bool {
        self.doc.is_connected(self.id)
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.doc.get_attribute(self.id, name)
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
        self.doc.set_attribute(self.id, name, value)
    }

    pub fn get_property(&self, name: &str) -> Value {
        self.doc.get_property(self.id, name)
    }

    pub fn set_property(&self, name: &str, value: Value) -> Result<(), DomError> {
        self.doc.set_property(self.id, name, value)
    }

    pub fn has_own_property(&self, name: &str) -> bool {
        self.doc.has_own_property(self.id, name)
    }

    pub fn take_own_property(&self, name: &str) -> Option<Value> {
        self.doc.take_own_property(self.id, name)
    }

    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&mut CustomEvent) + 'static,
    ) -> ListenerId {
        self.doc.add_event_listener(self.id, event_type, listener)
    }

    pub fn dispatch_event(&self, event: CustomEvent) -> bool {
        self.doc.dispatch_event(self.id, event)
    }
}

impl PartialEq for ElementRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc.ptr_eq(&other.doc)
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementRef({:?})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_document_structure() {
        let doc = Document::default();
        assert_eq!(doc.url(), "about:blank");
        assert_eq!(doc.parent(doc.body()), doc.document_element());
        assert!(doc.is_connected(doc.head()));
    }

    #[test]
    fn test_properties_fall_back_to_own() {
        let doc = Document::default();
        let div = doc.create_element("div");
        assert!(doc.get_property(div, "foo").is_undefined());

        doc.set_property(div, "foo", Value::from(1)).unwrap();
        assert!(doc.has_own_property(div, "foo"));
        assert_eq!(doc.take_own_property(div, "foo"), Some(Value::from(1)));
        assert!(!doc.has_own_property(div, "foo"));
    }

    #[test]
    fn test_dispatch_bubbles() {
        let doc = Document::default();
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();

        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        doc.add_event_listener(doc.body(), "ping", move |_| h.set(h.get() + 1));

        doc.dispatch_event(div, CustomEvent::new("ping", Value::Undefined));
        assert_eq!(hits.get(), 0);

        doc.dispatch_event(div, CustomEvent::new("ping", Value::Undefined).bubbling());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dispatch_reports_prevent_default() {
        let doc = Document::default();
        let div = doc.create_element("div");
        doc.add_event_listener(div, "x", |e| e.prevent_default());
        assert!(doc.dispatch_event(div, CustomEvent::new("x", Value::Undefined)));
        assert!(!doc.dispatch_event(div, CustomEvent::new("x", Value::Undefined).cancelable()));
    }

    #[test]
    fn test_listener_can_reenter_document() {
        let doc = Document::default();
        let div = doc.create_element("div");
        let d = doc.clone();
        doc.add_event_listener(div, "grow", move |e| {
            let child = d.create_element("span");
            d.append_child(e.target, child).unwrap();
        });
        doc.dispatch_event(div, CustomEvent::new("grow", Value::Undefined));
        assert_eq!(doc.child_nodes(div).len(), 1);
    }

    #[test]
    fn test_attributes() {
        let doc = Document::default();
        let div = doc.create_element("div");
        doc.set_attribute(div, "Title", "hello").unwrap();
        assert_eq!(doc.get_attribute(div, "title"), Some("hello".to_string()));
        doc.remove_attribute(div, "title").unwrap();
        assert_eq!(doc.get_attribute(div, "title"), None);

        let text = doc.create_text_node("t");
        assert_eq!(doc.set_attribute(text, "a", "b"), Err(DomError::NotAnElement(text)));
    }

    #[test]
    fn test_matches_selector() {
        let doc = Document::default();
        let p = doc.create_element("p");
        doc.set_attribute(p, "class", "lead").unwrap();
        assert_eq!(doc.matches_selector(p, "p.lead"), Ok(true));
        assert_eq!(doc.matches_selector(p, "div"), Ok(false));

        let text = doc.create_text_node("t");
        assert_eq!(doc.matches_selector(text, "*"), Ok(false));
        assert!(doc.matches_selector(p, "p >").is_err());
    }
}
