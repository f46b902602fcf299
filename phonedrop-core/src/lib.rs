pub mod domain;
pub mod error;

pub use domain::{Role, SessionId, SignalingKind, SignalingMessage, MAX_SESSION_ID_LEN};
pub use error::{CoreError, Result};
