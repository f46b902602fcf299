use std::fmt;

/// Lifecycle of a device's connection to its peer
///
/// `New → Connecting → Connected → Disconnected → Failed`. `Failed` is
/// terminal; `Disconnected` may go back to `Connecting` on reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::New => "new",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed)
    }

    /// Whether a caller may start a fresh `connect()` from here
    pub fn can_connect(self) -> bool {
        matches!(self, ConnectionState::New | ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State reported by the underlying peer-connection primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}
