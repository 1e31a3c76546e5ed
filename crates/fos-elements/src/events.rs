//! Strategy event stream

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::Value;

use crate::emitter::{EventEmitter, Subscription};

/// An output emission relabeled with its DOM event name
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyEvent {
    pub name: String,
    pub value: Value,
}

/// Merged stream of the current component instance's outputs.
///
/// Subscribers stay attached across component re-creation; only the
/// underlying output sources are swapped.
#[derive(Clone, Default)]
pub struct EventBridge {
    merged: EventEmitter<StrategyEvent>,
    sources: Rc<RefCell<Vec<Subscription>>>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&StrategyEvent) + 'static) -> Subscription {
        self.merged.subscribe(listener)
    }

    /// Replace the merged sources with `(event name, output emitter)` pairs
    pub fn bind(&self, outputs: Vec<(String, EventEmitter)>) {
        let subscriptions = outputs
            .into_iter()
            .map(|(name, output)| {
                let merged = self.merged.clone();
                output.subscribe(move |value| {
                    merged.emit(StrategyEvent {
                        name: name.clone(),
                        value: value.clone(),
                    })
                })
            })
            .collect();

        let previous = std::mem::replace(&mut *self.sources.borrow_mut(), subscriptions);
        drop(previous);
    }

    /// Detach from the current instance's outputs
    pub fn unbind(&self) {
        let previous = std::mem::take(&mut *self.sources.borrow_mut());
        drop(previous);
    }

    /// Whether output sources are currently merged in
    pub fn is_bound(&self) -> bool {
        !self.sources.borrow().is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.merged.observer_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bridge: &EventBridge) -> (Rc<RefCell<Vec<StrategyEvent>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let sub = bridge.subscribe(move |e| s.borrow_mut().push(e.clone()));
        (seen, sub)
    }

    #[test]
    fn test_relabels_outputs() {
        let bridge = EventBridge::new();
        let (seen, _sub) = record(&bridge);

        let saved: EventEmitter = EventEmitter::new();
        let closed: EventEmitter = EventEmitter::new();
        bridge.bind(vec![("save".to_string(), saved.clone()), ("close".to_string(), closed.clone())]);

        saved.emit(Value::from(42));
        closed.emit(Value::Undefined);

        assert_eq!(
            *seen.borrow(),
            vec![
                StrategyEvent { name: "save".to_string(), value: Value::from(42) },
                StrategyEvent { name: "close".to_string(), value: Value::Undefined },
            ]
        );
    }

    #[test]
    fn test_rebind_switches_sources() {
        let bridge = EventBridge::new();
        let (seen, _sub) = record(&bridge);

        let first: EventEmitter = EventEmitter::new();
        bridge.bind(vec![("tick".to_string(), first.clone())]);
        let second: EventEmitter = EventEmitter::new();
        bridge.bind(vec![("tick".to_string(), second.clone())]);

        first.emit(Value::from(1));
        second.emit(Value::from(2));

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].value, Value::from(2));
        assert_eq!(first.observer_count(), 0);
    }

    #[test]
    fn test_unbind() {
        let bridge = EventBridge::new();
        let (seen, _sub) = record(&bridge);
        let output: EventEmitter = EventEmitter::new();
        bridge.bind(vec![("x".to_string(), output.clone())]);
        assert!(bridge.is_bound());

        bridge.unbind();
        output.emit(Value::Null);
        assert!(seen.borrow().is_empty());
        assert!(!bridge.is_bound());
    }

    #[test]
    fn test_subscribers_survive_rebind() {
        let bridge = EventBridge::new();
        let (_seen, first) = record(&bridge);
        let (_other, second) = record(&bridge);
        assert_eq!(bridge.subscriber_count(), 2);

        bridge.bind(vec![("x".to_string(), EventEmitter::new())]);
        bridge.unbind();
        assert_eq!(bridge.subscriber_count(), 2);

        drop(first);
        assert_eq!(bridge.subscriber_count(), 1);
        second.unsubscribe();
        assert_eq!(bridge.subscriber_count(), 0);
    }
}
