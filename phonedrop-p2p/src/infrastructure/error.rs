use crate::domain::ConnectionState;
use phonedrop_core::CoreError;
use std::time::Duration;

/// Frame-level violations of the file-transfer protocol.
///
/// All of them are recoverable: the offending frame is dropped and the
/// channel stays usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Malformed control frame: {0}")]
    MalformedFrame(String),

    #[error("Unknown control frame type: {0}")]
    UnknownFrame(String),

    #[error("Dropped {len} byte chunk received without file metadata")]
    ChunkWithoutMetadata { len: usize },

    #[error("File end received without file metadata")]
    EndWithoutMetadata,
}

/// Infrastructure layer errors
#[derive(Debug, thiserror::Error)]
pub enum P2PError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out after {0:?}")]
    ConnectionTimeout(Duration),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    #[error("Peer connection not initialized")]
    PeerNotInitialized,

    #[error("Data channel not ready")]
    ChannelNotReady,

    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectAttemptsExhausted { attempts: u32 },

    #[error("Peer disconnected")]
    PeerDisconnected,

    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, P2PError>;
