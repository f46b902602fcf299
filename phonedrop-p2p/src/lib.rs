// Domain layer (core)
pub mod domain;

// Application layer (use cases)
pub mod application;

// Infrastructure layer (adapters)
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    ConnectionConfig, ConnectionObserver, DeviceConnection, DeviceConnectionBuilder,
    FileReceiver, NoopObserver, CHUNK_SIZE,
};
pub use domain::{
    ConnectionState, FileMetadata, IceCandidate, IceServer, OutgoingFile, PeerConnectionState,
    ReceivedFile, SdpType, SessionDescription,
};
pub use infrastructure::error::{P2PError, Result, TransferError};
pub use infrastructure::transport::{
    DataChannel, Frame, LinkEvent, PeerConnection, PeerEvent, PeerFactory, SignalingConnector,
    SignalingLink, DATA_CHANNEL_LABEL,
};
#[cfg(feature = "native")]
pub use infrastructure::WebSocketConnector;
