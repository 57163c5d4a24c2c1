use crate::Value;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Observations published while a chain routes events.
///
/// The monitor is a side channel for tooling (runtimes, CLIs, tests). It
/// never feeds back into routing, so a halted chain still reports what it
/// dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ChainEvent {
    Dispatched {
        event: String,
        payload: Value,
        listeners: usize,
    },
    Dropped {
        event: String,
    },
    Halted {
        reason: String,
    },
}

pub struct Monitor {
    sender: broadcast::Sender<ChainEvent>,
}

impl Monitor {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ChainEvent) {
        let _ = self.sender.send(event);
    }
}
