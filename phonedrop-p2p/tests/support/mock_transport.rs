use async_trait::async_trait;
use phonedrop_core::SessionId;
use phonedrop_p2p::{
    ConnectionObserver, ConnectionState, DataChannel, Frame, IceCandidate, IceServer, LinkEvent,
    P2PError, PeerConnection, PeerConnectionState, PeerEvent, PeerFactory, ReceivedFile, Result,
    SessionDescription, SignalingConnector, SignalingLink,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// What the next `open` call does
#[derive(Debug, Clone)]
pub enum OpenBehavior {
    Open,
    /// `open` itself returns an error
    Fail(String),
    /// The link never reports `Opened`
    Hang,
    /// The link reports an error instead of opening
    ErrorEvent(String),
}

/// Test-side end of one signaling link
#[derive(Clone)]
pub struct LinkHandle {
    events: UnboundedSender<LinkEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl LinkHandle {
    /// Deliver a message as if the relay forwarded it
    pub fn deliver(&self, text: &str) {
        let _ = self.events.send(LinkEvent::Message(text.to_string()));
    }

    pub fn drop_unclean(&self) {
        let _ = self.events.send(LinkEvent::Closed { clean: false });
    }

    pub fn close_clean(&self) {
        let _ = self.events.send(LinkEvent::Closed { clean: true });
    }

    pub fn error(&self, message: &str) {
        let _ = self.events.send(LinkEvent::Error(message.to_string()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Sent messages decoded as JSON
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockLink {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl SignalingLink for MockLink {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(P2PError::SendFailed("link closed".to_string()));
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector following a script of open behaviors
pub struct MockConnector {
    script: Mutex<VecDeque<OpenBehavior>>,
    links: Mutex<Vec<LinkHandle>>,
    opens: AtomicUsize,
}

impl MockConnector {
    pub fn new(script: Vec<OpenBehavior>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            links: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, behavior: OpenBehavior) {
        self.script.lock().unwrap().push_back(behavior);
    }

    /// Number of `open` calls so far
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn last_link(&self) -> Option<LinkHandle> {
        self.links.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SignalingConnector for MockConnector {
    async fn open(
        &self,
        _session_id: &SessionId,
    ) -> Result<(Box<dyn SignalingLink>, UnboundedReceiver<LinkEvent>)> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(OpenBehavior::Open);

        if let OpenBehavior::Fail(message) = &behavior {
            return Err(P2PError::ConnectionFailed(message.clone()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LinkHandle {
            events: tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };

        match behavior {
            OpenBehavior::Open => {
                let _ = handle.events.send(LinkEvent::Opened);
            }
            OpenBehavior::ErrorEvent(message) => {
                let _ = handle.events.send(LinkEvent::Error(message));
            }
            OpenBehavior::Hang | OpenBehavior::Fail(_) => {}
        }

        let link = MockLink {
            sent: handle.sent.clone(),
            closed: handle.closed.clone(),
        };
        self.links.lock().unwrap().push(handle);
        Ok((Box::new(link), rx))
    }
}

/// Shared view of a mock data channel
#[derive(Default)]
pub struct ChannelState {
    pub open: AtomicBool,
    pub closed: AtomicBool,
    pub frames: Mutex<Vec<Frame>>,
}

impl ChannelState {
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }
}

pub struct MockDataChannel {
    label: String,
    state: Arc<ChannelState>,
}

impl MockDataChannel {
    pub fn new(label: &str, state: Arc<ChannelState>) -> Self {
        Self {
            label: label.to_string(),
            state,
        }
    }
}

impl DataChannel for MockDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    fn send(&mut self, frame: Frame) -> Result<()> {
        if !self.is_open() {
            return Err(P2PError::ChannelClosed);
        }
        self.state.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.state.open.store(false, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

/// Test-side end of one peer connection
#[derive(Clone)]
pub struct PeerHandle {
    events: UnboundedSender<PeerEvent>,
    calls: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    pub channel: Arc<ChannelState>,
}

impl PeerHandle {
    pub fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event);
    }

    /// Calls made on the peer connection, e.g. `set_remote:offer`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockPeer {
    calls: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    channel: Arc<ChannelState>,
    fail_offer: bool,
}

impl MockPeer {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

fn sdp_kind(description: &SessionDescription) -> String {
    serde_json::to_value(description.sdp_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn create_data_channel(&mut self, label: &str) -> Result<Box<dyn DataChannel>> {
        self.record(format!("create_data_channel:{label}"));
        Ok(Box::new(MockDataChannel::new(label, self.channel.clone())))
    }

    async fn create_offer(&mut self) -> Result<SessionDescription> {
        self.record("create_offer");
        if self.fail_offer {
            return Err(P2PError::Negotiation("offer refused".to_string()));
        }
        Ok(SessionDescription::offer("v=0 local-offer"))
    }

    async fn create_answer(&mut self) -> Result<SessionDescription> {
        self.record("create_answer");
        Ok(SessionDescription::answer("v=0 local-answer"))
    }

    async fn set_local_description(&mut self, description: SessionDescription) -> Result<()> {
        self.record(format!("set_local:{}", sdp_kind(&description)));
        Ok(())
    }

    async fn set_remote_description(&mut self, description: SessionDescription) -> Result<()> {
        self.record(format!("set_remote:{}", sdp_kind(&description)));
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        self.record(format!("add_ice_candidate:{}", candidate.candidate));
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockPeerFactory {
    peers: Mutex<Vec<PeerHandle>>,
    fail_offer: AtomicBool,
}

impl MockPeerFactory {
    /// Make `create_offer` fail on peers created from now on
    pub fn fail_offers(&self) {
        self.fail_offer.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn last_peer(&self) -> Option<PeerHandle> {
        self.peers.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PeerFactory for MockPeerFactory {
    async fn create(
        &self,
        _ice_servers: &[IceServer],
    ) -> Result<(Box<dyn PeerConnection>, UnboundedReceiver<PeerEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PeerHandle {
            events: tx,
            calls: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            channel: Arc::new(ChannelState::default()),
        };

        let peer = MockPeer {
            calls: handle.calls.clone(),
            closed: handle.closed.clone(),
            channel: handle.channel.clone(),
            fail_offer: self.fail_offer.load(Ordering::SeqCst),
        };
        self.peers.lock().unwrap().push(handle);
        Ok((Box::new(peer), rx))
    }
}

/// Observer recording every notification
#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<ConnectionState>>,
    pub errors: Mutex<Vec<String>>,
    pub files: Mutex<Vec<ReceivedFile>>,
    pub peer_states: Mutex<Vec<PeerConnectionState>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<ReceivedFile> {
        self.files.lock().unwrap().clone()
    }
}

impl ConnectionObserver for RecordingObserver {
    fn on_state_change(&self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_error(&self, error: &P2PError) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn on_file_received(&self, file: &ReceivedFile) {
        self.files.lock().unwrap().push(file.clone());
    }

    fn on_peer_state_change(&self, state: PeerConnectionState) {
        self.peer_states.lock().unwrap().push(state);
    }
}
