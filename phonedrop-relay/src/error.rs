use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Rejections of a connection attempt and failures talking to the relay
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Missing session ID")]
    MissingSessionId,

    #[error("Invalid session ID")]
    InvalidSessionId(String),

    #[error("Cross-origin request rejected")]
    ForbiddenOrigin,

    #[error("Expected WebSocket upgrade")]
    UpgradeRequired,

    #[error("Session already has both connections")]
    SessionFull,

    #[error("Session limit reached ({0} sessions)")]
    LimitReached(usize),

    #[error("Relay unavailable")]
    RelayUnavailable,

    #[error("Internal relay error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingSessionId | RelayError::InvalidSessionId(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            RelayError::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            RelayError::SessionFull => StatusCode::CONFLICT,
            RelayError::LimitReached(_) | RelayError::RelayUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        // The validation detail stays in the logs; clients get the short reason
        (self.status_code(), self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
