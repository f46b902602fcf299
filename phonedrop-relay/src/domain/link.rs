use std::fmt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tracing::warn;

/// Relay-unique identifier of one accepted WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u64);

impl LinkId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// What the relay asks a socket writer to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// Server end of a device's signaling connection.
///
/// Writes never block: the per-link channel is bounded and a full or closed
/// channel drops the message.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    sender: Sender<Outbound>,
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Link {
    pub fn new(id: LinkId, sender: Sender<Outbound>) -> Self {
        Link { id, sender }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Whether the socket writer is still draining this link
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a text frame; returns whether it was accepted
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.push(Outbound::Text(text.into()))
    }

    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.push(Outbound::Close {
            code,
            reason: reason.to_string(),
        })
    }

    fn push(&self, outbound: Outbound) -> bool {
        match self.sender.try_send(outbound) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(link = %self.id, "Link buffer full, dropping outbound frame");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
