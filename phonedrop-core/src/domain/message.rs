use crate::domain::Role;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Discriminator of the signaling envelope (`{"type": ..., "payload"?: ...}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalingKind {
    /// Relay notice: link accepted, carries the assigned role
    Connected,
    Offer,
    Answer,
    IceCandidate,
    /// Relay notice: the other device went away
    PeerDisconnected,
}

impl SignalingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalingKind::Connected => "connected",
            SignalingKind::Offer => "offer",
            SignalingKind::Answer => "answer",
            SignalingKind::IceCandidate => "ice-candidate",
            SignalingKind::PeerDisconnected => "peer-disconnected",
        }
    }

    /// Kinds the relay itself emits. Devices may still send them; the relay
    /// forwards them like any other recognized kind.
    pub fn is_relay_notice(self) -> bool {
        matches!(
            self,
            SignalingKind::Connected | SignalingKind::PeerDisconnected
        )
    }

    /// Read the `type` of a raw envelope without interpreting its payload.
    ///
    /// Fails on non-JSON input, non-object JSON, a missing or non-string
    /// `type`, and unknown types.
    pub fn peek(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| CoreError::MalformedMessage(e.to_string()))?;

        let kind = value
            .as_object()
            .ok_or_else(|| CoreError::MalformedMessage("expected a JSON object".to_string()))?
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::MalformedMessage("missing `type`".to_string()))?;

        kind.parse()
    }
}

impl FromStr for SignalingKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "connected" => Ok(SignalingKind::Connected),
            "offer" => Ok(SignalingKind::Offer),
            "answer" => Ok(SignalingKind::Answer),
            "ice-candidate" => Ok(SignalingKind::IceCandidate),
            "peer-disconnected" => Ok(SignalingKind::PeerDisconnected),
            other => Err(CoreError::UnknownMessageType(other.to_string())),
        }
    }
}

impl fmt::Display for SignalingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of the signaling envelope, used by the devices.
///
/// The relay never decodes messages into this type when forwarding; it only
/// builds its own notices with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalingMessage {
    Connected {
        role: Role,
    },
    Offer {
        #[serde(default)]
        payload: Value,
    },
    Answer {
        #[serde(default)]
        payload: Value,
    },
    IceCandidate {
        #[serde(default)]
        payload: Value,
    },
    PeerDisconnected,
}

impl SignalingMessage {
    pub fn kind(&self) -> SignalingKind {
        match self {
            SignalingMessage::Connected { .. } => SignalingKind::Connected,
            SignalingMessage::Offer { .. } => SignalingKind::Offer,
            SignalingMessage::Answer { .. } => SignalingKind::Answer,
            SignalingMessage::IceCandidate { .. } => SignalingKind::IceCandidate,
            SignalingMessage::PeerDisconnected => SignalingKind::PeerDisconnected,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::MalformedMessage(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        // Peek first so unknown types surface as such instead of as a serde error
        SignalingKind::peek(raw)?;
        serde_json::from_str(raw).map_err(|e| CoreError::MalformedMessage(e.to_string()))
    }
}
