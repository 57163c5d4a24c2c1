use linkcore::{Chain, LinkError, Value};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The outcome event was dispatched with this payload
    Completed(Value),
    /// The chain latched an error before the outcome event was seen
    Halted(String),
    TimedOut,
}

impl RunOutcome {
    /// Completed payload, or the halt/timeout as an error. `outcome` names
    /// the awaited event in the timeout message.
    pub fn into_result(self, outcome: &str) -> linkcore::Result<Value> {
        match self {
            RunOutcome::Completed(value) => Ok(value),
            RunOutcome::Halted(reason) => Err(LinkError::Halted(reason)),
            RunOutcome::TimedOut => Err(LinkError::TimedOut(outcome.to_string())),
        }
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Give up waiting after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Broadcast `stop` to the chain once the run ends
    pub stop_on_exit: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            stop_on_exit: true,
        }
    }
}

/// Starts a chain, feeds it an entry event and waits for an outcome.
pub struct ChainRuntime<G> {
    chain: Chain<G>,
    config: RuntimeConfig,
}

impl<G: Send + Sync + 'static> ChainRuntime<G> {
    pub fn new(chain: Chain<G>) -> Self {
        Self::with_config(chain, RuntimeConfig::default())
    }

    pub fn with_config(chain: Chain<G>, config: RuntimeConfig) -> Self {
        Self { chain, config }
    }

    pub fn chain(&self) -> &Chain<G> {
        &self.chain
    }

    /// Start the chain, dispatch `entry` if given, and wait until `outcome`
    /// is dispatched, the chain halts, or the timeout expires.
    ///
    /// The entry cascade runs on its own task so the timeout also bounds
    /// slow execute steps. With `stop_on_exit` that task is aborted when the
    /// run ends, along with stopping the chain.
    ///
    /// The outcome is caught by a subscriber on the chain, not through the
    /// monitor, so a lagging monitor cannot lose it. The subscriber stays
    /// registered after the run and ignores later dispatches.
    pub async fn run(&self, entry: Option<(&str, Value)>, outcome: &str) -> RunOutcome {
        let mut monitor = self.chain.monitor();
        let (reached_tx, mut reached) = mpsc::channel::<Value>(1);
        self.chain.subscribe(outcome, move |_chain, payload| {
            let _ = reached_tx.try_send(payload);
            async {}
        });
        let deadline = self.config.timeout.map(|t| Instant::now() + t);

        tracing::info!("Running chain until '{}'", outcome);
        self.chain.start();

        let cascade = entry.map(|(event, payload)| {
            let chain = self.chain.clone();
            let event = event.to_string();
            tokio::spawn(async move { chain.dispatch(&event, payload).await })
        });

        let result = loop {
            if let Ok(payload) = reached.try_recv() {
                break RunOutcome::Completed(payload);
            }
            if let Some(reason) = self.chain.halt_reason() {
                break RunOutcome::Halted(reason);
            }

            // The monitor only wakes the loop; the latch is re-read above.
            let wake = async {
                tokio::select! {
                    biased;
                    Some(payload) = reached.recv() => Wake::Reached(payload),
                    received = monitor.recv() => match received {
                        Err(RecvError::Closed) => Wake::Closed,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!("Runtime monitor lagged, skipped {} events", skipped);
                            Wake::Recheck
                        }
                        Ok(_) => Wake::Recheck,
                    },
                }
            };

            let woke = match deadline {
                Some(deadline) => timeout_at(deadline, wake).await.ok(),
                None => Some(wake.await),
            };

            match woke {
                Some(Wake::Reached(payload)) => break RunOutcome::Completed(payload),
                Some(Wake::Recheck) => {}
                Some(Wake::Closed) => break RunOutcome::Halted("monitor closed".to_string()),
                None => match reached.try_recv() {
                    Ok(payload) => break RunOutcome::Completed(payload),
                    Err(_) => break RunOutcome::TimedOut,
                },
            }
        };

        if self.config.stop_on_exit {
            if let Some(task) = cascade {
                task.abort();
            }
            self.chain.stop();
        }
        tracing::info!("Run finished: {:?}", result);
        result
    }
}

enum Wake {
    Reached(Value),
    Recheck,
    Closed,
}
