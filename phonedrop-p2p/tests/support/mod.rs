#![allow(dead_code)]

pub mod mock_transport;

use phonedrop_core::SessionId;
use phonedrop_p2p::{ConnectionConfig, DeviceConnection};
use std::sync::Arc;
use std::time::Duration;

pub use mock_transport::{
    ChannelState, LinkHandle, MockConnector, MockDataChannel, MockPeerFactory, OpenBehavior,
    PeerHandle, RecordingObserver,
};

/// A device connection wired to in-memory transports
pub struct ConnectionFixture {
    pub connection: DeviceConnection,
    pub connector: Arc<MockConnector>,
    pub peers: Arc<MockPeerFactory>,
    pub observer: Arc<RecordingObserver>,
}

impl ConnectionFixture {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    /// Opens follow `script` in order, then succeed
    pub fn with_script(script: Vec<OpenBehavior>) -> Self {
        let connector = Arc::new(MockConnector::new(script));
        let peers = Arc::new(MockPeerFactory::default());
        let observer = Arc::new(RecordingObserver::default());

        let config = ConnectionConfig::new("ws://relay.test")
            .with_connect_timeout(Duration::from_secs(10))
            .with_reconnect_delay(Duration::from_secs(2))
            .with_max_reconnect_attempts(3);

        let connection =
            DeviceConnection::builder(session_id(), connector.clone(), peers.clone())
                .config(config)
                .observer(observer.clone())
                .build();

        Self {
            connection,
            connector,
            peers,
            observer,
        }
    }

    /// Link opened by the most recent successful `open`
    pub fn link(&self) -> LinkHandle {
        self.connector.last_link().expect("no link opened")
    }

    pub fn peer(&self) -> PeerHandle {
        self.peers.last_peer().expect("no peer created")
    }
}

pub fn session_id() -> SessionId {
    SessionId::parse("test-session-1").unwrap()
}

/// Log to the test writer, honouring RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
