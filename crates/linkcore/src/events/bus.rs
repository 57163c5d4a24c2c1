use crate::{Chain, Value};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A subscriber callback. It receives the dispatching chain so that it can
/// emit follow-up events without owning a reference to the chain.
pub type Handler<G> = Arc<dyn Fn(Chain<G>, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Event name -> subscribers, kept in subscription order
pub struct EventBus<G> {
    handlers: RwLock<HashMap<String, Vec<Handler<G>>>>,
}

impl<G> EventBus<G> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, event: impl Into<String>, handler: Handler<G>) {
        self.handlers
            .write()
            .entry(event.into())
            .or_default()
            .push(handler);
    }

    /// Snapshot of the handlers for `event`. Callers await these after the
    /// lock is released, so handlers may subscribe or dispatch re-entrantly.
    pub fn handlers(&self, event: &str) -> Vec<Handler<G>> {
        self.handlers
            .read()
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }
}

impl<G> Default for EventBus<G> {
    fn default() -> Self {
        Self::new()
    }
}
