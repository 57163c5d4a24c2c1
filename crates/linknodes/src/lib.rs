//! Standard node library
//!
//! Built-in nodes and transformers for common pipeline chores: periodic
//! ticks, deadlines, outbound HTTP calls, payload logging and JSON
//! conversion.

mod debug;
mod deadline;
mod http;
mod ticker;
mod transform;

pub use deadline::DeadlineNode;
pub use debug::{DebugNode, LogPayload};
pub use http::{Fetch, HttpNode, HttpRequest, HttpResolver, HttpResponse, ReqwestFetch, SuccessStatus};
pub use ticker::{TickerNode, DEFAULT_PERIOD, TICK_EVENT};
pub use transform::{Field, JsonParse, JsonStringify};
