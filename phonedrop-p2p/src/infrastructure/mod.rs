pub mod error;
pub mod transport;
#[cfg(feature = "native")]
pub mod websocket;

pub use error::{P2PError, Result, TransferError};
pub use transport::{
    DataChannel, Frame, LinkEvent, PeerConnection, PeerEvent, PeerFactory, SignalingConnector,
    SignalingLink, DATA_CHANNEL_LABEL,
};
#[cfg(feature = "native")]
pub use websocket::WebSocketConnector;
