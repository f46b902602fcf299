use crate::domain::IceServer;
use phonedrop_core::SessionId;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Configuration for a device connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Relay base URL, e.g. `wss://drop.example`
    pub signaling_url: String,

    pub ice_servers: Vec<IceServer>,

    /// Bound on opening the signaling link
    pub connect_timeout: Duration,

    /// Delay before each reconnect after an unexpected drop
    pub reconnect_delay: Duration,

    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://localhost:8787".to_string(),
            ice_servers: IceServer::default_stun_servers(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ConnectionConfig {
    pub fn new(signaling_url: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            ..Default::default()
        }
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServer>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Relay endpoint for a session under `base_url`
    pub fn connect_url(base_url: &str, session_id: &SessionId) -> String {
        format!(
            "{}/api/signal/connect?session={}",
            base_url.trim_end_matches('/'),
            session_id
        )
    }
}
