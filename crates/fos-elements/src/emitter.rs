//! Output streams
//!
//! Single-threaded multicast emitter used for component outputs and for the
//! strategy's merged event stream.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use fos_dom::Value;

type Listener<T> = Rc<dyn Fn(&T)>;

struct EmitterInner<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Multicast event source
pub struct EventEmitter<T = Value> {
    inner: Rc<RefCell<EmitterInner<T>>>,
}

impl<T: 'static> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EmitterInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener; it stays registered until the subscription ends
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.listeners.push((id, Rc::new(listener)));
            id
        };

        let weak: Weak<RefCell<EmitterInner<T>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Deliver `value` to the listeners registered when the call starts
    pub fn emit(&self, value: T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&value);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("observers", &self.inner.borrow().listeners.len())
            .finish()
    }
}

/// Active listener registration. Ends on `unsubscribe` or drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.end();
    }

    fn end(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}
