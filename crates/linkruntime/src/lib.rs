//! Chain execution runtime
//!
//! Drives an assembled chain from an entry event to an outcome and offers
//! diagnostics over the wiring between its nodes.

mod graph;
mod runtime;

pub use graph::WiringGraph;
pub use runtime::{ChainRuntime, RunOutcome, RuntimeConfig};
