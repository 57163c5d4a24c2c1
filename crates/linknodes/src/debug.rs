use async_trait::async_trait;
use linkcore::{Chain, ChainNode, Context, Execute, NodeArgs, NodeError, Value};
use std::sync::Arc;

/// Execute step that logs every payload and passes it through unchanged
pub struct LogPayload {
    label: String,
}

impl LogPayload {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

#[async_trait]
impl<G: Send + Sync + 'static> Execute<G> for LogPayload {
    async fn execute(
        &self,
        _previous: Option<Value>,
        data: Value,
        _ctx: &Context<G>,
    ) -> Result<Value, NodeError> {
        match &data {
            Value::String(message) => tracing::info!("DEBUG [{}]: {}", self.label, message),
            other => tracing::info!("DEBUG [{}]: {}", self.label, other.to_plain_json()),
        }
        Ok(data)
    }
}

/// Builds nodes that log their payload before resolving
pub struct DebugNode;

impl DebugNode {
    /// Any execute step already in `args` is replaced.
    pub fn new<G: Send + Sync + 'static>(chain: &Chain<G>, args: NodeArgs<G>) -> Arc<ChainNode<G>> {
        let label = args.name.clone().unwrap_or_else(|| args.event.clone());
        ChainNode::new(chain, args.with_execute(LogPayload::new(label)))
    }
}
