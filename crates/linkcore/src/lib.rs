//! Core abstractions for linked event chains
//!
//! A [`Chain`] routes named events to the [`ChainNode`]s subscribed to
//! them. Each node runs an optional execute step, then hands its output to
//! its [`Transition`]s, which emit further events on the same chain. The
//! first reported error latches the chain and stops all further delivery.

mod chain;
mod config;
mod error;
pub mod events;
mod node;
mod transition;
mod value;

pub use chain::{Chain, Context, WeakChain, ERROR_EVENT};
pub use config::{ChainConfig, ErrorMode};
pub use error::{LinkError, NodeError};
pub use events::ChainEvent;
pub use node::{
    execute_fn, ChainNode, Execute, FnExecute, Forward, Lifecycle, NodeArgs, NodeId, Resolve,
};
pub use transition::{
    condition_fn, predicate, transform_fn, Always, Condition, FnCondition, FnTransformer,
    Identity, Never, Predicate, Transformer, Transition, Transitions,
};
pub use value::Value;

/// Result type for chain operations
pub type Result<T> = std::result::Result<T, LinkError>;
