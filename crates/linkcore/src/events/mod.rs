// crates/linkcore/src/events/mod.rs

mod bus;
mod monitor;

pub use bus::{EventBus, Handler};
pub use monitor::{ChainEvent, Monitor};
