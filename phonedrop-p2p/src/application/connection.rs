use super::config::ConnectionConfig;
use super::observer::{ConnectionObserver, NoopObserver};
use super::transfer::{self, FileReceiver};
use crate::domain::{ConnectionState, IceCandidate, OutgoingFile, SessionDescription};
use crate::infrastructure::error::{P2PError, Result};
use crate::infrastructure::transport::{
    DataChannel, LinkEvent, PeerConnection, PeerEvent, PeerFactory, SignalingConnector,
    SignalingLink, DATA_CHANNEL_LABEL,
};
use phonedrop_core::{Role, SessionId, SignalingMessage};
use serde_json::Value;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout, Sleep};
use tracing::{debug, info, instrument, warn};

type OpenedLink = (Box<dyn SignalingLink>, UnboundedReceiver<LinkEvent>);

/// One device's side of a pairing: the signaling link to the relay, the
/// peer connection negotiated over it, and the file channel on top.
///
/// Driven by a single task: call [`connect`](Self::connect), then keep
/// calling [`poll`](Self::poll) until it returns `false`.
pub struct DeviceConnection {
    session_id: SessionId,
    config: ConnectionConfig,
    connector: Arc<dyn SignalingConnector>,
    peers: Arc<dyn PeerFactory>,
    observer: Arc<dyn ConnectionObserver>,

    state: ConnectionState,
    role: Option<Role>,
    attempts: u32,

    link: Option<Box<dyn SignalingLink>>,
    link_events: Option<UnboundedReceiver<LinkEvent>>,
    peer: Option<Box<dyn PeerConnection>>,
    peer_events: Option<UnboundedReceiver<PeerEvent>>,
    channel: Option<Box<dyn DataChannel>>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    receiver: FileReceiver,
}

impl DeviceConnection {
    pub fn builder(
        session_id: SessionId,
        connector: Arc<dyn SignalingConnector>,
        peers: Arc<dyn PeerFactory>,
    ) -> DeviceConnectionBuilder {
        DeviceConnectionBuilder::new(session_id, connector, peers)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Role assigned by the relay, once its `connected` notice arrived
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_reconnect_scheduled(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn has_open_channel(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    /// Replace the observer; the last one set wins
    pub fn set_observer(&mut self, observer: Arc<dyn ConnectionObserver>) {
        self.observer = observer;
    }

    /// Open the signaling link and instantiate the peer connection.
    ///
    /// Resets the reconnect budget. Any failure, including the open
    /// timeout, leaves the connection `Failed`.
    #[instrument(skip(self), fields(session = %self.session_id.short()))]
    pub async fn connect(&mut self) -> Result<()> {
        if !self.state.can_connect() {
            return Err(P2PError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        self.attempts = 0;
        self.reconnect_timer = None;

        if let Err(e) = self.establish().await {
            warn!(error = %e, "Connect failed");
            self.shutdown().await;
            self.set_state(ConnectionState::Failed);
            return Err(e);
        }
        Ok(())
    }

    /// Wait for the next link event, peer event or reconnect deadline and
    /// handle it. Returns `false` once there is nothing left to wait for.
    pub async fn poll(&mut self) -> bool {
        if self.link_events.is_none() && self.peer_events.is_none() && self.reconnect_timer.is_none()
        {
            return false;
        }

        tokio::select! {
            event = next_event(&mut self.link_events) => self.handle_link_event(event).await,
            event = next_event(&mut self.peer_events) => self.handle_peer_event(event).await,
            _ = deadline(&mut self.reconnect_timer) => self.reconnect().await,
        }
        true
    }

    /// Open the `fileTransfer` channel and send an offer (responder side)
    #[instrument(skip(self), fields(session = %self.session_id.short()))]
    pub async fn create_offer(&mut self) -> Result<()> {
        let peer = self.peer.as_mut().ok_or(P2PError::PeerNotInitialized)?;

        let channel = peer.create_data_channel(DATA_CHANNEL_LABEL).await?;
        let offer = peer.create_offer().await?;
        peer.set_local_description(offer.clone()).await?;
        self.channel = Some(channel);

        info!("Sending offer");
        self.send_signal(SignalingMessage::Offer {
            payload: serde_json::to_value(&offer)?,
        })
        .await
    }

    /// Stream a file over the data channel
    pub fn send_file(&mut self, file: &OutgoingFile) -> Result<()> {
        let channel = self
            .channel
            .as_mut()
            .filter(|c| c.is_open())
            .ok_or(P2PError::ChannelNotReady)?;
        transfer::send_file(&mut **channel, file)
    }

    /// Tear everything down. Safe to call in any state, any number of times.
    #[instrument(skip(self), fields(session = %self.session_id.short()))]
    pub async fn close(&mut self) {
        self.shutdown().await;
        match self.state {
            ConnectionState::Connecting
            | ConnectionState::Connected
            | ConnectionState::Disconnected => self.set_state(ConnectionState::Disconnected),
            ConnectionState::New | ConnectionState::Failed => {}
        }
    }

    async fn establish(&mut self) -> Result<()> {
        self.set_state(ConnectionState::Connecting);

        let opening = open_link(self.connector.clone(), self.session_id.clone());
        let (link, link_events) = timeout(self.config.connect_timeout, opening)
            .await
            .map_err(|_| P2PError::ConnectionTimeout(self.config.connect_timeout))??;
        self.link = Some(link);
        self.link_events = Some(link_events);

        let (peer, peer_events) = self.peers.create(&self.config.ice_servers).await?;
        self.peer = Some(peer);
        self.peer_events = Some(peer_events);

        self.set_state(ConnectionState::Connected);
        Ok(())
    }

    #[instrument(skip(self), fields(session = %self.session_id.short(), attempt = self.attempts))]
    async fn reconnect(&mut self) {
        self.reconnect_timer = None;
        info!("Reconnecting");

        match self.establish().await {
            Ok(()) => {
                info!("Reconnected");
                self.attempts = 0;
            }
            Err(e @ P2PError::ConnectionTimeout(_)) => {
                warn!(error = %e, "Reconnect timed out");
                self.shutdown().await;
                self.set_state(ConnectionState::Failed);
                self.observer.on_error(&e);
            }
            Err(e) => {
                warn!(error = %e, "Reconnect failed");
                self.observer.on_error(&e);
                self.on_link_lost();
            }
        }
    }

    /// Unexpected loss of the signaling link
    fn on_link_lost(&mut self) {
        self.teardown();
        self.set_state(ConnectionState::Disconnected);

        if self.attempts < self.config.max_reconnect_attempts {
            self.attempts += 1;
            info!(
                attempt = self.attempts,
                delay = ?self.config.reconnect_delay,
                "Scheduling reconnect"
            );
            self.reconnect_timer = Some(Box::pin(sleep(self.config.reconnect_delay)));
        } else {
            let error = P2PError::ReconnectAttemptsExhausted {
                attempts: self.attempts,
            };
            warn!(error = %error, "Giving up");
            self.observer.on_error(&error);
        }
    }

    async fn handle_link_event(&mut self, event: Option<LinkEvent>) {
        match event {
            Some(LinkEvent::Message(text)) => self.handle_signal(&text).await,
            Some(LinkEvent::Closed { clean: true }) => {
                info!("Signaling link closed by relay");
                self.teardown();
                self.set_state(ConnectionState::Disconnected);
            }
            Some(LinkEvent::Closed { clean: false }) | None => {
                warn!("Signaling link dropped");
                self.on_link_lost();
            }
            Some(LinkEvent::Error(e)) => warn!(error = %e, "Signaling link error"),
            Some(LinkEvent::Opened) => debug!("Duplicate open event"),
        }
    }

    async fn handle_signal(&mut self, text: &str) {
        let message = match SignalingMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring signaling message");
                return;
            }
        };

        let result = match message {
            SignalingMessage::Connected { role } => {
                info!(%role, "Role assigned");
                self.role = Some(role);
                Ok(())
            }
            SignalingMessage::Offer { payload } => self.handle_offer(payload).await,
            SignalingMessage::Answer { payload } => self.handle_answer(payload).await,
            SignalingMessage::IceCandidate { payload } => self.handle_remote_candidate(payload).await,
            SignalingMessage::PeerDisconnected => {
                info!("Peer disconnected");
                self.shutdown().await;
                self.set_state(ConnectionState::Failed);
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "Negotiation step failed");
            self.observer.on_error(&e);
        }
    }

    async fn handle_offer(&mut self, payload: Value) -> Result<()> {
        let offer: SessionDescription = serde_json::from_value(payload)?;
        let peer = self.peer.as_mut().ok_or(P2PError::PeerNotInitialized)?;

        peer.set_remote_description(offer).await?;
        let answer = peer.create_answer().await?;
        peer.set_local_description(answer.clone()).await?;

        info!("Sending answer");
        self.send_signal(SignalingMessage::Answer {
            payload: serde_json::to_value(&answer)?,
        })
        .await
    }

    async fn handle_answer(&mut self, payload: Value) -> Result<()> {
        let answer: SessionDescription = serde_json::from_value(payload)?;
        let peer = self.peer.as_mut().ok_or(P2PError::PeerNotInitialized)?;
        peer.set_remote_description(answer).await
    }

    async fn handle_remote_candidate(&mut self, payload: Value) -> Result<()> {
        let candidate: IceCandidate = serde_json::from_value(payload)?;
        let peer = self.peer.as_mut().ok_or(P2PError::PeerNotInitialized)?;
        peer.add_ice_candidate(candidate).await
    }

    async fn handle_peer_event(&mut self, event: Option<PeerEvent>) {
        let Some(event) = event else {
            debug!("Peer event stream ended");
            self.peer_events = None;
            return;
        };

        match event {
            PeerEvent::IceCandidate(candidate) => {
                let sent = match serde_json::to_value(&candidate) {
                    Ok(payload) => {
                        self.send_signal(SignalingMessage::IceCandidate { payload })
                            .await
                    }
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = sent {
                    warn!(error = %e, "Failed to trickle candidate");
                }
            }
            PeerEvent::StateChanged(state) => {
                debug!(?state, "Peer connection state");
                self.observer.on_peer_state_change(state);
            }
            PeerEvent::DataChannel(channel) => {
                info!(label = channel.label(), "Remote data channel");
                self.channel = Some(channel);
            }
            PeerEvent::ChannelOpen => info!("Data channel open"),
            PeerEvent::ChannelClosed => info!("Data channel closed"),
            PeerEvent::Frame(frame) => match self.receiver.on_frame(frame) {
                Ok(Some(file)) => self.observer.on_file_received(&file),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Dropping transfer frame"),
            },
        }
    }

    async fn send_signal(&mut self, message: SignalingMessage) -> Result<()> {
        let text = message.to_json()?;
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| P2PError::SendFailed("signaling link not open".to_string()))?;
        link.send(text).await
    }

    /// Drop the peer, channel and link without a close handshake
    fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(mut peer) = self.peer.take() {
            peer.close();
        }
        self.peer_events = None;
        self.link = None;
        self.link_events = None;
        self.receiver = FileReceiver::new();
    }

    async fn shutdown(&mut self) {
        self.reconnect_timer = None;
        let link = self.link.take();
        self.teardown();
        if let Some(mut link) = link {
            link.close().await;
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "State change");
        self.state = state;
        self.observer.on_state_change(state);
    }
}

/// Open a link and wait for its `Opened` event
async fn open_link(
    connector: Arc<dyn SignalingConnector>,
    session_id: SessionId,
) -> Result<OpenedLink> {
    let (link, mut events) = connector.open(&session_id).await?;
    loop {
        match events.recv().await {
            Some(LinkEvent::Opened) => return Ok((link, events)),
            Some(LinkEvent::Error(e)) => return Err(P2PError::ConnectionFailed(e)),
            Some(LinkEvent::Closed { .. }) | None => {
                return Err(P2PError::ConnectionFailed(
                    "signaling link closed while opening".to_string(),
                ))
            }
            Some(LinkEvent::Message(_)) => {
                debug!("Ignoring message received before open");
            }
        }
    }
}

async fn next_event<T>(events: &mut Option<UnboundedReceiver<T>>) -> Option<T> {
    match events {
        Some(events) => events.recv().await,
        None => pending().await,
    }
}

async fn deadline(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

/// Builder for [`DeviceConnection`]
pub struct DeviceConnectionBuilder {
    session_id: SessionId,
    connector: Arc<dyn SignalingConnector>,
    peers: Arc<dyn PeerFactory>,
    config: ConnectionConfig,
    observer: Arc<dyn ConnectionObserver>,
}

impl DeviceConnectionBuilder {
    pub fn new(
        session_id: SessionId,
        connector: Arc<dyn SignalingConnector>,
        peers: Arc<dyn PeerFactory>,
    ) -> Self {
        Self {
            session_id,
            connector,
            peers,
            config: ConnectionConfig::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> DeviceConnection {
        DeviceConnection {
            session_id: self.session_id,
            config: self.config,
            connector: self.connector,
            peers: self.peers,
            observer: self.observer,
            state: ConnectionState::New,
            role: None,
            attempts: 0,
            link: None,
            link_events: None,
            peer: None,
            peer_events: None,
            channel: None,
            reconnect_timer: None,
            receiver: FileReceiver::new(),
        }
    }
}
