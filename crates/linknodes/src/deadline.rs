use crate::ticker::TICK_EVENT;
use linkcore::{Chain, ChainNode, NodeArgs, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

/// Dispatches its own event once, on the first tick at or after a deadline.
///
/// The payload is the number of whole `unit`s elapsed since the node was
/// built (seconds by default), so transitions attached to the node resolve
/// against the elapsed time. The node only polls `"tick"`: assemble a
/// [`TickerNode`](crate::TickerNode) on the same chain, once, before
/// starting it. Several deadline nodes share that one ticker.
pub struct DeadlineNode<G> {
    node: Arc<ChainNode<G>>,
    fired: Arc<AtomicBool>,
}

impl<G: Send + Sync + 'static> DeadlineNode<G> {
    pub fn new(chain: &Chain<G>, args: NodeArgs<G>, deadline: Duration) -> Self {
        Self::with_unit(chain, args, deadline, Duration::from_secs(1))
    }

    pub fn with_unit(chain: &Chain<G>, args: NodeArgs<G>, deadline: Duration, unit: Duration) -> Self {
        let event = args.event.clone();
        let node = ChainNode::new(chain, args);
        let fired = Arc::new(AtomicBool::new(false));
        let started = Instant::now();
        let unit_nanos = unit.as_nanos().max(1);

        let latch = Arc::clone(&fired);
        chain.subscribe(TICK_EVENT, move |chain: Chain<G>, _tick: Value| {
            let latch = Arc::clone(&latch);
            let event = event.clone();
            async move {
                let elapsed = started.elapsed();
                if elapsed < deadline || latch.swap(true, Ordering::SeqCst) {
                    return;
                }
                let units = (elapsed.as_nanos() / unit_nanos) as u64;
                tracing::info!("Deadline '{}' reached after {} units", event, units);
                chain.dispatch(&event, Value::from(units)).await;
            }
        });

        Self { node, fired }
    }

    pub fn node(&self) -> &Arc<ChainNode<G>> {
        &self.node
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
