use crate::{Chain, Context, NodeError, Value};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Guard deciding whether a transition fires.
#[async_trait]
pub trait Condition<G>: Send + Sync {
    async fn check(&self, data: &Value, ctx: &Context<G>) -> Result<bool, NodeError>;
}

/// Computes the payload of the event a transition emits.
#[async_trait]
pub trait Transformer<G>: Send + Sync {
    async fn transform(&self, data: &Value, ctx: &Context<G>) -> Result<Value, NodeError>;
}

/// Guard that is always satisfied
pub struct Always;

/// Guard that is never satisfied
pub struct Never;

/// Transformer forwarding its input unchanged
pub struct Identity;

#[async_trait]
impl<G: Send + Sync + 'static> Condition<G> for Always {
    async fn check(&self, _data: &Value, _ctx: &Context<G>) -> Result<bool, NodeError> {
        Ok(true)
    }
}

#[async_trait]
impl<G: Send + Sync + 'static> Condition<G> for Never {
    async fn check(&self, _data: &Value, _ctx: &Context<G>) -> Result<bool, NodeError> {
        Ok(false)
    }
}

#[async_trait]
impl<G: Send + Sync + 'static> Transformer<G> for Identity {
    async fn transform(&self, data: &Value, _ctx: &Context<G>) -> Result<Value, NodeError> {
        Ok(data.clone())
    }
}

pub struct FnCondition<F>(F);

/// Wrap an async closure `(data, ctx) -> Result<bool, NodeError>`.
pub fn condition_fn<G, F, Fut>(f: F) -> FnCondition<F>
where
    F: Fn(Value, Context<G>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, NodeError>> + Send,
{
    FnCondition(f)
}

#[async_trait]
impl<G, F, Fut> Condition<G> for FnCondition<F>
where
    G: Send + Sync + 'static,
    F: Fn(Value, Context<G>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, NodeError>> + Send,
{
    async fn check(&self, data: &Value, ctx: &Context<G>) -> Result<bool, NodeError> {
        (self.0)(data.clone(), Arc::clone(ctx)).await
    }
}

pub struct Predicate<F, G> {
    f: F,
    _context: PhantomData<fn(&G)>,
}

/// Synchronous guard over the payload and context.
pub fn predicate<G, F>(f: F) -> Predicate<F, G>
where
    F: Fn(&Value, &G) -> bool + Send + Sync,
{
    Predicate {
        f,
        _context: PhantomData,
    }
}

#[async_trait]
impl<G, F> Condition<G> for Predicate<F, G>
where
    G: Send + Sync + 'static,
    F: Fn(&Value, &G) -> bool + Send + Sync,
{
    async fn check(&self, data: &Value, ctx: &Context<G>) -> Result<bool, NodeError> {
        Ok((self.f)(data, ctx.as_ref()))
    }
}

pub struct FnTransformer<F>(F);

/// Wrap an async closure `(data, ctx) -> Result<Value, NodeError>`.
pub fn transform_fn<G, F, Fut>(f: F) -> FnTransformer<F>
where
    F: Fn(Value, Context<G>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, NodeError>> + Send,
{
    FnTransformer(f)
}

#[async_trait]
impl<G, F, Fut> Transformer<G> for FnTransformer<F>
where
    G: Send + Sync + 'static,
    F: Fn(Value, Context<G>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, NodeError>> + Send,
{
    async fn transform(&self, data: &Value, ctx: &Context<G>) -> Result<Value, NodeError> {
        (self.0)(data.clone(), Arc::clone(ctx)).await
    }
}

/// A guarded edge from a node's output to another event
pub struct Transition<G> {
    condition: Arc<dyn Condition<G>>,
    event: String,
    transformer: Arc<dyn Transformer<G>>,
}

impl<G: Send + Sync + 'static> Transition<G> {
    pub fn new(
        condition: impl Condition<G> + 'static,
        event: impl Into<String>,
        transformer: impl Transformer<G> + 'static,
    ) -> Self {
        Self {
            condition: Arc::new(condition),
            event: event.into(),
            transformer: Arc::new(transformer),
        }
    }

    /// Unconditional edge forwarding the payload unchanged.
    pub fn always(event: impl Into<String>) -> Self {
        Self::new(Always, event, Identity)
    }

    /// Guarded edge forwarding the payload unchanged.
    pub fn when(condition: impl Condition<G> + 'static, event: impl Into<String>) -> Self {
        Self::new(condition, event, Identity)
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

/// Ordered transition list owned by one node
pub struct Transitions<G> {
    list: RwLock<Vec<Arc<Transition<G>>>>,
}

impl<G: Send + Sync + 'static> Transitions<G> {
    pub fn new() -> Self {
        Self {
            list: RwLock::new(Vec::new()),
        }
    }

    pub fn push(&self, transition: Transition<G>) {
        self.list.write().push(Arc::new(transition));
    }

    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }

    pub fn targets(&self) -> Vec<String> {
        self.list.read().iter().map(|t| t.event.clone()).collect()
    }

    fn snapshot(&self) -> Vec<Arc<Transition<G>>> {
        self.list.read().clone()
    }

    /// Evaluate every transition against `data`, in insertion order.
    ///
    /// Each guard, transform and resulting dispatch completes before the
    /// next transition is looked at. A failing guard or transform is
    /// reported and only skips its own transition.
    pub async fn resolve(&self, chain: &Chain<G>, data: Value) {
        for transition in self.snapshot() {
            match transition.condition.check(&data, chain.context()).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    chain
                        .report(NodeError::ConditionFailed {
                            event: transition.event.clone(),
                            message: err.to_string(),
                        })
                        .await;
                    continue;
                }
            }

            tracing::debug!("Transitioning to {}", transition.event);
            match transition.transformer.transform(&data, chain.context()).await {
                Ok(payload) => chain.dispatch(&transition.event, payload).await,
                Err(err) => {
                    chain
                        .report(NodeError::TransformFailed {
                            event: transition.event.clone(),
                            message: err.to_string(),
                        })
                        .await
                }
            }
        }
    }
}

impl<G: Send + Sync + 'static> Default for Transitions<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Send + Sync + 'static> From<Vec<Transition<G>>> for Transitions<G> {
    fn from(transitions: Vec<Transition<G>>) -> Self {
        Self {
            list: RwLock::new(transitions.into_iter().map(Arc::new).collect()),
        }
    }
}
