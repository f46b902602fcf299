//! Seams to the transport primitives the embedder supplies.
//!
//! The signaling link is a text message pipe to the relay; the peer
//! connection and its data channel are the realtime stack of the platform.
//! Each producer hands back an unbounded receiver of events, which is the
//! only way events reach the connection.

use crate::domain::{IceCandidate, IceServer, PeerConnectionState, SessionDescription};
use crate::infrastructure::error::Result;
use async_trait::async_trait;
use phonedrop_core::SessionId;
use std::fmt;
use tokio::sync::mpsc::UnboundedReceiver;

/// Label of the single data channel a device pair uses
pub const DATA_CHANNEL_LABEL: &str = "fileTransfer";

/// One data-channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Emitted once, before any message
    Opened,
    Message(String),
    /// `clean` when the relay completed a close handshake
    Closed { clean: bool },
    Error(String),
}

#[async_trait]
pub trait SignalingConnector: Send + Sync {
    /// Open a signaling link for `session_id`
    async fn open(
        &self,
        session_id: &SessionId,
    ) -> Result<(Box<dyn SignalingLink>, UnboundedReceiver<LinkEvent>)>;
}

#[async_trait]
pub trait SignalingLink: Send {
    async fn send(&mut self, text: String) -> Result<()>;
    async fn close(&mut self);
}

pub enum PeerEvent {
    /// A local candidate to trickle to the peer
    IceCandidate(IceCandidate),
    StateChanged(PeerConnectionState),
    /// The remote side opened a data channel (answerer only)
    DataChannel(Box<dyn DataChannel>),
    ChannelOpen,
    ChannelClosed,
    Frame(Frame),
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerEvent::IceCandidate(c) => f.debug_tuple("IceCandidate").field(c).finish(),
            PeerEvent::StateChanged(s) => f.debug_tuple("StateChanged").field(s).finish(),
            PeerEvent::DataChannel(c) => f.debug_tuple("DataChannel").field(&c.label()).finish(),
            PeerEvent::ChannelOpen => f.write_str("ChannelOpen"),
            PeerEvent::ChannelClosed => f.write_str("ChannelClosed"),
            PeerEvent::Frame(frame) => f.debug_tuple("Frame").field(frame).finish(),
        }
    }
}

#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create(
        &self,
        ice_servers: &[IceServer],
    ) -> Result<(Box<dyn PeerConnection>, UnboundedReceiver<PeerEvent>)>;
}

#[async_trait]
pub trait PeerConnection: Send {
    async fn create_data_channel(&mut self, label: &str) -> Result<Box<dyn DataChannel>>;
    async fn create_offer(&mut self) -> Result<SessionDescription>;
    async fn create_answer(&mut self) -> Result<SessionDescription>;
    async fn set_local_description(&mut self, description: SessionDescription) -> Result<()>;
    async fn set_remote_description(&mut self, description: SessionDescription) -> Result<()>;
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<()>;
    fn close(&mut self);
}

/// Ordered, reliable message channel between the two devices.
///
/// `send` is fire-and-forget; flow control is left to the implementation.
pub trait DataChannel: Send {
    fn label(&self) -> &str;
    fn is_open(&self) -> bool;
    fn send(&mut self, frame: Frame) -> Result<()>;
    fn close(&mut self);
}
