use linkcore::{Chain, ChainNode, Lifecycle, NodeArgs, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Event every ticker dispatches
pub const TICK_EVENT: &str = "tick";

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Node that dispatches `"tick"` with an increasing counter while the
/// chain is started.
///
/// The first tick carries 0 and arrives one period after `start`.
pub struct TickerNode<G> {
    node: Arc<ChainNode<G>>,
    ticker: Arc<Ticker>,
}

impl<G: Send + Sync + 'static> TickerNode<G> {
    pub fn new(chain: &Chain<G>, args: NodeArgs<G>, period: Duration) -> Self {
        let ticker = Arc::new(Ticker {
            period,
            counter: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        });
        let node = ChainNode::new(chain, args.with_lifecycle(ticker.clone()));
        Self { node, ticker }
    }

    pub fn node(&self) -> &Arc<ChainNode<G>> {
        &self.node
    }

    /// Number of ticks dispatched so far.
    pub fn ticks(&self) -> u64 {
        self.ticker.counter.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.ticker.running.lock().is_some()
    }
}

struct Ticker {
    period: Duration,
    counter: Arc<AtomicU64>,
    running: Mutex<Option<CancellationToken>>,
}

impl<G: Send + Sync + 'static> Lifecycle<G> for Ticker {
    fn start(&self, chain: &Chain<G>) {
        let mut running = self.running.lock();
        if running.is_some() {
            tracing::debug!("Ticker already running");
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Ticker started outside a tokio runtime, not ticking");
            return;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let chain = chain.downgrade();
        let counter = Arc::clone(&self.counter);
        let period = self.period;

        tracing::info!("Ticker started, period {:?}", period);
        handle.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(chain) = chain.upgrade() else { break };
                        let tick = counter.fetch_add(1, Ordering::SeqCst);
                        chain.dispatch(TICK_EVENT, Value::from(tick)).await;
                    }
                }
            }
            tracing::debug!("Ticker task finished");
        });

        *running = Some(token);
    }

    fn stop(&self) {
        if let Some(token) = self.running.lock().take() {
            tracing::info!("Ticker stopped");
            token.cancel();
        }
    }
}
