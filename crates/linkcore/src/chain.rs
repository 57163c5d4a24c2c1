use crate::events::{ChainEvent, EventBus, Handler, Monitor};
use crate::{ChainConfig, ChainNode, ErrorMode, NodeError, Value};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

/// Event name every failure inside a chain is reported under
pub const ERROR_EVENT: &str = "error";

/// Shared state handed to every execute step, guard and transformer
pub type Context<G> = Arc<G>;

/// Event bus, node registry and error latch for one pipeline.
///
/// `Chain` is a cheap handle; clones refer to the same pipeline. Nodes do
/// not keep the chain alive: handlers receive it at dispatch time and
/// background activities hold a [`WeakChain`].
pub struct Chain<G> {
    inner: Arc<ChainInner<G>>,
}

struct ChainInner<G> {
    context: Context<G>,
    config: ChainConfig,
    bus: EventBus<G>,
    nodes: RwLock<Vec<Arc<ChainNode<G>>>>,
    /// Set once an error has been claimed for delivery
    error_seen: AtomicBool,
    halted: AtomicBool,
    halt_reason: Mutex<Option<String>>,
    monitor: Monitor,
}

impl<G> Clone for Chain<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: Send + Sync + 'static> Chain<G> {
    pub fn new(context: G) -> Self {
        Self::with_config(context, ChainConfig::default())
    }

    pub fn with_config(context: G, config: ChainConfig) -> Self {
        tracing::debug!("Setting up chain ({:?} errors)", config.error_mode);
        let monitor = Monitor::new(config.monitor_capacity);
        Self {
            inner: Arc::new(ChainInner {
                context: Arc::new(context),
                config,
                bus: EventBus::new(),
                nodes: RwLock::new(Vec::new()),
                error_seen: AtomicBool::new(false),
                halted: AtomicBool::new(false),
                halt_reason: Mutex::new(None),
                monitor,
            }),
        }
    }

    pub fn context(&self) -> &Context<G> {
        &self.inner.context
    }

    pub fn config(&self) -> &ChainConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakChain<G> {
        WeakChain {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Append a node to the registry. Event names are not required to be unique.
    pub fn add_node(&self, node: Arc<ChainNode<G>>) {
        tracing::debug!("Registering node {} on '{}'", node.id(), node.event());
        self.inner.nodes.write().push(node);
    }

    /// Registered nodes in registration order.
    pub fn nodes(&self) -> Vec<Arc<ChainNode<G>>> {
        self.inner.nodes.read().clone()
    }

    /// Subscribe a raw handler to `event`.
    pub fn subscribe<F, Fut>(&self, event: impl Into<String>, callback: F)
    where
        F: Fn(Chain<G>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler<G> =
            Arc::new(move |chain: Chain<G>, payload: Value| callback(chain, payload).boxed());
        self.inner.bus.subscribe(event, handler);
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.bus.listener_count(event)
    }

    /// Broadcast `start` to every registered node, in registration order.
    pub fn start(&self) {
        tracing::info!("Starting chain");
        for node in self.nodes() {
            node.start(self);
        }
    }

    /// Broadcast `stop` to every registered node, in registration order.
    pub fn stop(&self) {
        tracing::info!("Stopping chain");
        for node in self.nodes() {
            node.stop();
        }
    }

    /// Deliver `payload` to every subscriber of `event`, one after another.
    ///
    /// Subscribers run depth-first: a subscriber that dispatches again
    /// completes that cascade before the next subscriber of `event` starts.
    /// Once the error latch is set this does nothing.
    pub async fn dispatch(&self, event: &str, payload: Value) {
        if event == ERROR_EVENT {
            self.dispatch_error(payload).await;
            return;
        }

        if self.is_halted() {
            tracing::debug!("Chain halted, dropping '{}'", event);
            self.inner.monitor.emit(ChainEvent::Dropped {
                event: event.to_string(),
            });
            return;
        }

        self.deliver(event, payload).await;
    }

    /// Report a failure through the `"error"` event.
    pub async fn report(&self, err: NodeError) {
        tracing::error!("{}", err);
        self.dispatch(ERROR_EVENT, Value::String(err.to_string())).await;
    }

    pub fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::SeqCst)
    }

    /// Rendering of the error that halted the chain, if any.
    pub fn halt_reason(&self) -> Option<String> {
        self.inner.halt_reason.lock().clone()
    }

    /// Source event -> target event for every node with transitions.
    ///
    /// The map is single valued: when a node has several transitions, the
    /// last one registered wins.
    pub fn transitions_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for node in self.nodes() {
            for target in node.transition_targets() {
                map.insert(node.event().to_string(), target);
            }
        }
        map
    }

    /// Watch routing decisions as they happen.
    pub fn monitor(&self) -> broadcast::Receiver<ChainEvent> {
        self.inner.monitor.subscribe()
    }

    async fn dispatch_error(&self, payload: Value) {
        let first = !self.inner.error_seen.swap(true, Ordering::SeqCst);
        if !first {
            tracing::debug!("Chain halted, dropping '{}'", ERROR_EVENT);
            self.inner.monitor.emit(ChainEvent::Dropped {
                event: ERROR_EVENT.to_string(),
            });
            return;
        }

        match self.inner.config.error_mode {
            ErrorMode::Swallow => {
                self.latch(&payload);
                self.inner.monitor.emit(ChainEvent::Dropped {
                    event: ERROR_EVENT.to_string(),
                });
            }
            ErrorMode::DeliverFirst => {
                // Latched before delivery: whatever the error handlers
                // dispatch is already dropped.
                self.latch(&payload);
                self.deliver(ERROR_EVENT, payload).await;
            }
        }
    }

    fn latch(&self, payload: &Value) {
        self.latch_with(render_reason(payload));
    }

    fn latch_with(&self, reason: String) {
        tracing::warn!("Chain halted: {}", reason);
        *self.inner.halt_reason.lock() = Some(reason.clone());
        self.inner.halted.store(true, Ordering::SeqCst);
        self.inner.monitor.emit(ChainEvent::Halted { reason });
    }

    async fn deliver(&self, event: &str, payload: Value) {
        let handlers = self.inner.bus.handlers(event);
        self.inner.monitor.emit(ChainEvent::Dispatched {
            event: event.to_string(),
            payload: payload.clone(),
            listeners: handlers.len(),
        });

        if handlers.is_empty() {
            tracing::debug!("No subscribers for '{}'", event);
            return;
        }

        for handler in handlers {
            handler(self.clone(), payload.clone()).await;
        }
    }
}

fn render_reason(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_plain_json().to_string(),
    }
}

/// Non-owning chain handle for background activities
pub struct WeakChain<G> {
    inner: Weak<ChainInner<G>>,
}

impl<G> Clone for WeakChain<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<G> WeakChain<G> {
    pub fn upgrade(&self) -> Option<Chain<G>> {
        self.inner.upgrade().map(|inner| Chain { inner })
    }
}
