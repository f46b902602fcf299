use crate::domain::{ConnectionState, PeerConnectionState, ReceivedFile};
use crate::infrastructure::error::P2PError;

/// Receives a device connection's notifications.
///
/// Every method defaults to doing nothing, so implementors only override
/// what they care about.
pub trait ConnectionObserver: Send + Sync {
    fn on_state_change(&self, _state: ConnectionState) {}

    fn on_error(&self, _error: &P2PError) {}

    fn on_file_received(&self, _file: &ReceivedFile) {}

    fn on_peer_state_change(&self, _state: PeerConnectionState) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {}
