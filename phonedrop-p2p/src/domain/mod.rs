mod connection_state;
mod file;
mod ice_server;
mod signaling;

pub use connection_state::{ConnectionState, PeerConnectionState};
pub use file::{FileMetadata, OutgoingFile, ReceivedFile};
pub use ice_server::IceServer;
pub use signaling::{IceCandidate, SdpType, SessionDescription};
