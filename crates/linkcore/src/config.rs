use serde::{Deserialize, Serialize};

/// What happens to the first `"error"` dispatched on a chain.
///
/// Both modes latch: after the first error every dispatch is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// The latch is set before delivery, so the first error never reaches
    /// `"error"` subscribers. This is the historical behavior.
    #[default]
    Swallow,
    /// The latch is set, then the first error alone is delivered to
    /// `"error"` subscribers. Anything they dispatch is dropped.
    DeliverFirst,
}

/// Settings fixed when a chain is constructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub error_mode: ErrorMode,
    /// Buffer size of the monitor broadcast channel
    pub monitor_capacity: usize,
}

impl ChainConfig {
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Swallow,
            monitor_capacity: 1000,
        }
    }
}
