//! Interactive pick queries over TCP, one JSON object per line.

pub mod hub;
pub mod protocol;
pub mod server;
pub mod stats;
pub mod worker;

pub use hub::{ClientId, Hub};
pub use protocol::{NOT_SELECTED, QueryMessage, ResultMessage, format_outcome, parse_query};
pub use server::{QueryService, ServiceOptions};
pub use stats::{ServiceStats, StatsSnapshot};
pub use worker::{PickCommand, PickWorker};
