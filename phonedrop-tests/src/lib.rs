use async_trait::async_trait;
use cucumber::World;
use phonedrop_core::SessionId;
use phonedrop_p2p::{
    DataChannel, DeviceConnection, Frame, IceCandidate, IceServer, LinkEvent, OutgoingFile,
    P2PError, PeerConnection, PeerEvent, PeerFactory, ReceivedFile, SessionDescription,
    SignalingConnector, SignalingLink,
};
use phonedrop_relay::{Accepted, Outbound, RelayError, RelayOutcome, SessionStore, SignalingRelay};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// Inactivity threshold used by the scenarios
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(900);

/// One simulated device attached to the relay
#[derive(Debug)]
pub struct Device {
    pub session: String,
    pub accepted: Option<Accepted>,
    pub rejection: Option<RelayError>,
    pub outbound: mpsc::Receiver<Outbound>,
    /// Everything the relay wrote to this device so far
    pub inbox: Vec<Outbound>,
}

impl Device {
    /// Move pending relay output into the inbox
    pub fn drain(&mut self) -> &[Outbound] {
        while let Ok(message) = self.outbound.try_recv() {
            self.inbox.push(message);
        }
        &self.inbox
    }

    pub fn texts(&mut self) -> Vec<String> {
        self.drain()
            .iter()
            .filter_map(|m| match m {
                Outbound::Text(text) => Some(text.clone()),
                Outbound::Close { .. } => None,
            })
            .collect()
    }

    pub fn close_code(&mut self) -> Option<u16> {
        self.drain().iter().find_map(|m| match m {
            Outbound::Close { code, .. } => Some(*code),
            Outbound::Text(_) => None,
        })
    }
}

#[derive(World)]
pub struct PhonedropWorld {
    /// Relay core under test, driven with an explicit clock
    pub relay: SignalingRelay,
    pub now: Instant,
    pub devices: HashMap<String, Device>,
    /// Raw text of the last message a device sent
    pub last_sent: Option<String>,
    pub last_outcome: Option<RelayOutcome>,
    pub evicted: usize,

    pub connection: Option<DeviceConnection>,
    pub connector: Arc<ScriptedConnector>,
    pub polls: usize,

    pub outgoing: Option<OutgoingFile>,
    pub sent_frames: Vec<Frame>,
    pub received: Option<ReceivedFile>,
}

impl Default for PhonedropWorld {
    fn default() -> Self {
        Self {
            relay: SignalingRelay::new(SessionStore::new(INACTIVITY_TIMEOUT, 100)),
            now: Instant::now(),
            devices: HashMap::new(),
            last_sent: None,
            last_outcome: None,
            evicted: 0,
            connection: None,
            connector: Arc::new(ScriptedConnector::new(0)),
            polls: 0,
            outgoing: None,
            sent_frames: Vec::new(),
            received: None,
        }
    }
}

impl fmt::Debug for PhonedropWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhonedropWorld")
            .field("sessions", &self.relay.session_count())
            .field("devices", &self.devices.keys().collect::<Vec<_>>())
            .field("last_sent", &self.last_sent)
            .field("last_outcome", &self.last_outcome)
            .field("connection", &self.connection.as_ref().map(|c| c.state()))
            .field("opens", &self.connector.open_count())
            .finish()
    }
}

impl PhonedropWorld {
    /// Connect a named device, recording whether the relay admitted it
    pub fn connect_device(&mut self, name: &str, session: &str) {
        let (tx, rx) = mpsc::channel(32);
        let (accepted, rejection) = match self.relay.accept(session, tx, self.now) {
            Ok(accepted) => (Some(accepted), None),
            Err(e) => (None, Some(e)),
        };

        self.devices.insert(
            name.to_string(),
            Device {
                session: session.to_string(),
                accepted,
                rejection,
                outbound: rx,
                inbox: Vec::new(),
            },
        );
    }

    pub fn device(&mut self, name: &str) -> &mut Device {
        self.devices
            .get_mut(name)
            .unwrap_or_else(|| panic!("device {name} never connected"))
    }

    fn admitted(&mut self, name: &str) -> (SessionId, Accepted) {
        let device = self.device(name);
        let accepted = device
            .accepted
            .unwrap_or_else(|| panic!("device {name} was not admitted"));
        let id = SessionId::parse(&device.session).expect("admitted with a valid id");
        (id, accepted)
    }

    pub fn send_from(&mut self, name: &str, raw: &str) {
        let (id, accepted) = self.admitted(name);
        let outcome = self
            .relay
            .relay(&id, accepted.role, accepted.link_id, raw, self.now);
        self.last_outcome = Some(outcome);
        self.last_sent = Some(raw.to_string());
    }

    pub fn disconnect(&mut self, name: &str) {
        let (id, accepted) = self.admitted(name);
        self.relay
            .disconnect(&id, accepted.role, accepted.link_id, self.now);
    }

    pub fn has_session(&self, session: &str) -> bool {
        SessionId::parse(session).is_ok_and(|id| self.relay.store().contains(&id))
    }
}

/// Connector whose first `successes` opens succeed and the rest fail
#[derive(Default)]
pub struct ScriptedConnector {
    successes: AtomicUsize,
    opens: AtomicUsize,
    links: Mutex<Vec<UnboundedSender<LinkEvent>>>,
}

impl ScriptedConnector {
    pub fn new(successes: usize) -> Self {
        Self {
            successes: AtomicUsize::new(successes),
            ..Default::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Push an event into the most recently opened link
    pub fn emit(&self, event: LinkEvent) {
        if let Some(link) = self.links.lock().unwrap().last() {
            let _ = link.send(event);
        }
    }
}

#[async_trait]
impl SignalingConnector for ScriptedConnector {
    async fn open(
        &self,
        _session_id: &SessionId,
    ) -> phonedrop_p2p::Result<(Box<dyn SignalingLink>, UnboundedReceiver<LinkEvent>)> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let remaining = self.successes.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(P2PError::ConnectionFailed("relay unreachable".to_string()));
        }
        self.successes.store(remaining - 1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(LinkEvent::Opened);
        self.links.lock().unwrap().push(tx);
        Ok((Box::new(SilentLink), rx))
    }
}

struct SilentLink;

#[async_trait]
impl SignalingLink for SilentLink {
    async fn send(&mut self, _text: String) -> phonedrop_p2p::Result<()> {
        Ok(())
    }

    async fn close(&mut self) {}
}

/// Peer factory whose peers accept every negotiation step
#[derive(Default)]
pub struct LoopbackPeers {
    events: Mutex<Vec<UnboundedSender<PeerEvent>>>,
}

#[async_trait]
impl PeerFactory for LoopbackPeers {
    async fn create(
        &self,
        _ice_servers: &[IceServer],
    ) -> phonedrop_p2p::Result<(Box<dyn PeerConnection>, UnboundedReceiver<PeerEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events.lock().unwrap().push(tx);
        Ok((Box::new(LoopbackPeer), rx))
    }
}

struct LoopbackPeer;

#[async_trait]
impl PeerConnection for LoopbackPeer {
    async fn create_data_channel(
        &mut self,
        label: &str,
    ) -> phonedrop_p2p::Result<Box<dyn DataChannel>> {
        Ok(Box::new(RecordingChannel::new(label)))
    }

    async fn create_offer(&mut self) -> phonedrop_p2p::Result<SessionDescription> {
        Ok(SessionDescription::offer("v=0"))
    }

    async fn create_answer(&mut self) -> phonedrop_p2p::Result<SessionDescription> {
        Ok(SessionDescription::answer("v=0"))
    }

    async fn set_local_description(&mut self, _: SessionDescription) -> phonedrop_p2p::Result<()> {
        Ok(())
    }

    async fn set_remote_description(&mut self, _: SessionDescription) -> phonedrop_p2p::Result<()> {
        Ok(())
    }

    async fn add_ice_candidate(&mut self, _: IceCandidate) -> phonedrop_p2p::Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

/// Always-open data channel keeping every frame it was given
#[derive(Debug, Default)]
pub struct RecordingChannel {
    label: String,
    pub frames: Vec<Frame>,
}

impl RecordingChannel {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            frames: Vec::new(),
        }
    }
}

impl DataChannel for RecordingChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        true
    }

    fn send(&mut self, frame: Frame) -> phonedrop_p2p::Result<()> {
        self.frames.push(frame);
        Ok(())
    }

    fn close(&mut self) {}
}
