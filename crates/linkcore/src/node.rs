use crate::{Chain, Context, NodeError, Transition, Transitions, Value};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

pub type NodeId = Uuid;

/// Step run on every delivery before transitions are resolved.
#[async_trait]
pub trait Execute<G>: Send + Sync {
    /// `previous` is the node's output from its last delivery, if any.
    async fn execute(
        &self,
        previous: Option<Value>,
        data: Value,
        ctx: &Context<G>,
    ) -> Result<Value, NodeError>;
}

/// How a node hands its output on once execution succeeded.
///
/// Terminal nodes implement this to perform their own side effect; they
/// may still continue through `transitions` afterwards.
#[async_trait]
pub trait Resolve<G>: Send + Sync {
    async fn resolve(&self, chain: &Chain<G>, transitions: &Transitions<G>, data: Value);
}

/// Background activity tied to `Chain::start` / `Chain::stop`.
///
/// Both hooks are synchronous; long running work must be spawned.
pub trait Lifecycle<G>: Send + Sync {
    fn start(&self, chain: &Chain<G>);

    fn stop(&self);
}

/// Default resolution: run the transition loop.
pub struct Forward;

#[async_trait]
impl<G: Send + Sync + 'static> Resolve<G> for Forward {
    async fn resolve(&self, chain: &Chain<G>, transitions: &Transitions<G>, data: Value) {
        transitions.resolve(chain, data).await;
    }
}

pub struct FnExecute<F>(F);

/// Wrap an async closure `(previous, data, ctx) -> Result<Value, NodeError>`.
pub fn execute_fn<G, F, Fut>(f: F) -> FnExecute<F>
where
    F: Fn(Option<Value>, Value, Context<G>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, NodeError>> + Send,
{
    FnExecute(f)
}

#[async_trait]
impl<G, F, Fut> Execute<G> for FnExecute<F>
where
    G: Send + Sync + 'static,
    F: Fn(Option<Value>, Value, Context<G>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, NodeError>> + Send,
{
    async fn execute(
        &self,
        previous: Option<Value>,
        data: Value,
        ctx: &Context<G>,
    ) -> Result<Value, NodeError> {
        (self.0)(previous, data, Arc::clone(ctx)).await
    }
}

/// Wiring arguments for a [`ChainNode`]
pub struct NodeArgs<G> {
    pub event: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub execute: Option<Arc<dyn Execute<G>>>,
    pub transitions: Vec<Transition<G>>,
    pub resolver: Option<Arc<dyn Resolve<G>>>,
    pub lifecycle: Option<Arc<dyn Lifecycle<G>>>,
}

impl<G: Send + Sync + 'static> NodeArgs<G> {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            name: None,
            description: None,
            execute: None,
            transitions: Vec::new(),
            resolver: None,
            lifecycle: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_execute(mut self, execute: impl Execute<G> + 'static) -> Self {
        self.execute = Some(Arc::new(execute));
        self
    }

    pub fn with_transition(mut self, transition: Transition<G>) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn with_transitions(mut self, transitions: impl IntoIterator<Item = Transition<G>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn with_resolver(mut self, resolver: impl Resolve<G> + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn Lifecycle<G>>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }
}

/// A named processing step subscribed to one event on a [`Chain`].
///
/// Every delivery runs the optional execute step against the node's
/// previous output, remembers the result and resolves it: by default each
/// transition is evaluated in the order it was added.
pub struct ChainNode<G> {
    id: NodeId,
    event: String,
    name: Option<String>,
    description: Option<String>,
    execute: Option<Arc<dyn Execute<G>>>,
    transitions: Transitions<G>,
    resolver: Arc<dyn Resolve<G>>,
    lifecycle: Option<Arc<dyn Lifecycle<G>>>,
    transformed: Mutex<Option<Value>>,
}

impl<G: Send + Sync + 'static> ChainNode<G> {
    /// Build the node, subscribe it to `args.event` and register it.
    pub fn new(chain: &Chain<G>, args: NodeArgs<G>) -> Arc<Self> {
        let NodeArgs {
            event,
            name,
            description,
            execute,
            transitions,
            resolver,
            lifecycle,
        } = args;

        let node = Arc::new(Self {
            id: Uuid::new_v4(),
            event,
            name,
            description,
            execute,
            transitions: Transitions::from(transitions),
            resolver: resolver.unwrap_or_else(|| Arc::new(Forward) as Arc<dyn Resolve<G>>),
            lifecycle,
            transformed: Mutex::new(None),
        });

        let target = Arc::clone(&node);
        chain.subscribe(node.event.clone(), move |chain: Chain<G>, data: Value| {
            let node = Arc::clone(&target);
            async move { node.deliver(&chain, data).await }
        });
        chain.add_node(Arc::clone(&node));

        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Output retained from the last successful delivery.
    pub fn transformed(&self) -> Option<Value> {
        self.transformed.lock().clone()
    }

    pub fn transitions(&self) -> &Transitions<G> {
        &self.transitions
    }

    /// Append a transition. Takes effect from the next resolution.
    pub fn add_transition(&self, transition: Transition<G>) {
        self.transitions.push(transition);
    }

    /// Target events of this node's transitions, in evaluation order.
    pub fn transition_targets(&self) -> Vec<String> {
        self.transitions.targets()
    }

    pub fn start(&self, chain: &Chain<G>) {
        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.start(chain);
        }
    }

    pub fn stop(&self) {
        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.stop();
        }
    }

    /// Handle one delivery of this node's event.
    pub async fn deliver(&self, chain: &Chain<G>, data: Value) {
        let output = match &self.execute {
            Some(step) => {
                let previous = self.transformed();
                match step.execute(previous, data, chain.context()).await {
                    Ok(output) => output,
                    Err(err) => {
                        chain.report(err).await;
                        return;
                    }
                }
            }
            None => data,
        };

        *self.transformed.lock() = Some(output.clone());
        self.resolve(chain, output).await;
    }

    /// Hand `data` to the node's resolver.
    pub async fn resolve(&self, chain: &Chain<G>, data: Value) {
        tracing::debug!("Resolving {}", self.event);
        self.resolver.resolve(chain, &self.transitions, data).await;
    }
}
