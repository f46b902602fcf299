pub mod message;
pub mod role;
pub mod session_id;

pub use message::{SignalingKind, SignalingMessage};
pub use role::Role;
pub use session_id::{SessionId, MAX_SESSION_ID_LEN};
