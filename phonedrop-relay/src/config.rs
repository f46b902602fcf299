use crate::application::store::{DEFAULT_INACTIVITY_TIMEOUT, DEFAULT_MAX_SESSIONS};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8787";
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SHARDS: usize = 4;

/// Relay server configuration, from flags or `PHONEDROP_*` variables
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "phonedrop-relay", version, about = "phonedrop signaling relay")]
pub struct RelayConfig {
    /// Address to listen on
    #[arg(long, env = "PHONEDROP_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Seconds without activity before a session is evicted
    #[arg(long, env = "PHONEDROP_INACTIVITY_TIMEOUT", default_value_t = DEFAULT_INACTIVITY_TIMEOUT.as_secs())]
    pub inactivity_timeout_secs: u64,

    /// Seconds between eviction sweeps
    #[arg(long, env = "PHONEDROP_EVICTION_INTERVAL", default_value_t = DEFAULT_EVICTION_INTERVAL.as_secs())]
    pub eviction_interval_secs: u64,

    /// Number of relay actors sessions are spread over
    #[arg(long, env = "PHONEDROP_SHARDS", default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// Session cap per actor
    #[arg(long, env = "PHONEDROP_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Accept upgrades whose Origin differs from Host
    #[arg(long, env = "PHONEDROP_ALLOW_CROSS_ORIGIN")]
    pub allow_cross_origin: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "PHONEDROP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8787)),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT.as_secs(),
            eviction_interval_secs: DEFAULT_EVICTION_INTERVAL.as_secs(),
            shards: DEFAULT_SHARDS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            allow_cross_origin: false,
            json_logs: false,
            verbose: false,
        }
    }
}

impl RelayConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs.max(1))
    }

    pub fn shard_count(&self) -> usize {
        self.shards.max(1)
    }

    pub fn enforce_same_origin(&self) -> bool {
        !self.allow_cross_origin
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn with_cross_origin(mut self, allow: bool) -> Self {
        self.allow_cross_origin = allow;
        self
    }
}
