/// Errors raised while validating identifiers and decoding the wire envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),

    #[error("Malformed signaling message: {0}")]
    MalformedMessage(String),

    #[error("Unknown signaling message type: {0}")]
    UnknownMessageType(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
