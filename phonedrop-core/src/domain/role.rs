use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a device within a session.
///
/// The first device to connect becomes the initiator (it shows the pairing
/// code), the second becomes the responder. The responder opens the data
/// channel and sends the offer; the initiator answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// The role on the other end of the session
    pub fn other(self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    /// Whether this device creates the offer during negotiation
    pub fn is_offerer(self) -> bool {
        matches!(self, Role::Responder)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
