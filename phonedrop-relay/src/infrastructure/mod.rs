pub mod observability;
pub mod route;
mod security_headers;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod websocket_listener;

pub use observability::LogConfig;
pub use route::{create_signaling_route, SIGNAL_PATH};
