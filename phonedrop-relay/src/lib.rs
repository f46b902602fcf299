//! Signaling relay for phonedrop.
//!
//! Pairs exactly two devices per session over WebSocket and forwards their
//! negotiation messages (`offer`, `answer`, `ice-candidate`) verbatim until
//! they have a direct data channel.
//!
//! All session state lives inside [`application::RelayActor`] tasks; the
//! HTTP layer only talks to them through a [`application::RelayHandle`].

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::{
    Accepted, RelayCommand, RelayHandle, RelayOutcome, SessionStore, SignalingRelay,
};
pub use config::RelayConfig;
pub use domain::{Link, LinkId, Outbound, Session};
pub use error::{RelayError, Result};
pub use infrastructure::{create_signaling_route, LogConfig, SIGNAL_PATH};
