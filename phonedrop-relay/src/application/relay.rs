use super::store::SessionStore;
use crate::domain::{Link, LinkId, Outbound};
use crate::error::{RelayError, Result};
use phonedrop_core::{Role, SessionId, SignalingKind, SignalingMessage};
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub const PEER_GONE_CLOSE_CODE: u16 = 1000;
pub const PEER_GONE_CLOSE_REASON: &str = "Other peer disconnected";

/// Result of a successful `accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub role: Role,
    pub link_id: LinkId,
}

/// What happened to a message a device sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Forwarded(SignalingKind),
    /// Valid message, but the other role has no open link
    PeerAbsent,
    /// Not relayable; the reason is logged
    Dropped(String),
    /// The sending link no longer belongs to a live session
    UnknownSession,
}

/// Session lifecycle and message forwarding for the sessions of one actor.
///
/// Every method runs to completion without awaiting, so a single owner
/// serializes all operations on a session.
#[derive(Debug)]
pub struct SignalingRelay {
    store: SessionStore,
    next_link_id: u64,
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::new(SessionStore::default())
    }
}

impl SignalingRelay {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            next_link_id: 0,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    fn allocate_link_id(&mut self) -> LinkId {
        self.next_link_id += 1;
        LinkId::new(self.next_link_id)
    }

    /// Admit a device into a session and tell it its role.
    ///
    /// The raw id is validated before the store is touched.
    #[instrument(skip_all, fields(role))]
    pub fn accept(
        &mut self,
        session_id: &str,
        sender: Sender<Outbound>,
        now: Instant,
    ) -> Result<Accepted> {
        let id = SessionId::parse(session_id)
            .map_err(|e| RelayError::InvalidSessionId(e.to_string()))?;

        let link_id = self.allocate_link_id();
        let session = self.store.get_or_create(&id, now)?;

        let Some(role) = session.free_role() else {
            warn!(session = %id.short(), "Rejecting third connection");
            return Err(RelayError::SessionFull);
        };
        tracing::Span::current().record("role", role.as_str());

        let notice = SignalingMessage::Connected { role }
            .to_json()
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        let link = Link::new(link_id, sender);
        link.send_text(notice);
        session.attach(role, link);
        session.touch(now);

        info!(session = %id.short(), %role, %link_id, "Device connected");
        Ok(Accepted { role, link_id })
    }

    /// Forward a device's message to the other role, verbatim
    #[instrument(skip(self, session_id, raw, now), fields(session = %session_id.short()))]
    pub fn relay(
        &mut self,
        session_id: &SessionId,
        from: Role,
        link_id: LinkId,
        raw: &str,
        now: Instant,
    ) -> RelayOutcome {
        let kind = match SignalingKind::peek(raw) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "Dropping malformed signaling message");
                return RelayOutcome::Dropped(e.to_string());
            }
        };

        let Some(session) = self.store.get_mut(session_id) else {
            debug!(%kind, "Message for unknown session");
            return RelayOutcome::UnknownSession;
        };
        if !session.holds(from, link_id) {
            debug!(%kind, %link_id, "Message from a stale link");
            return RelayOutcome::UnknownSession;
        }

        session.touch(now);
        if kind.is_relay_notice() {
            debug!(%kind, "Device sent a relay notice kind");
        }

        match session.link(from.other()) {
            Some(target) if target.is_open() && target.send_text(raw) => {
                debug!(%kind, to = %from.other(), "Forwarded");
                RelayOutcome::Forwarded(kind)
            }
            _ => {
                debug!(%kind, "Peer absent, message dropped");
                RelayOutcome::PeerAbsent
            }
        }
    }

    /// Release a device's link and tear the session down.
    ///
    /// Returns whether the session was removed. A `link_id` that no longer
    /// matches the role's link is a stale disconnect and changes nothing.
    #[instrument(skip(self, session_id, now), fields(session = %session_id.short()))]
    pub fn disconnect(
        &mut self,
        session_id: &SessionId,
        role: Role,
        link_id: LinkId,
        now: Instant,
    ) -> bool {
        let Some(session) = self.store.get_mut(session_id) else {
            return false;
        };

        if session.detach(role, link_id).is_none() {
            debug!(%link_id, "Ignoring stale disconnect");
            return false;
        }
        session.touch(now);
        info!(%role, %link_id, "Device disconnected");

        if let Some(peer) = session.release(role.other()) {
            if peer.is_open() {
                if let Ok(notice) = SignalingMessage::PeerDisconnected.to_json() {
                    peer.send_text(notice);
                }
                peer.close(PEER_GONE_CLOSE_CODE, PEER_GONE_CLOSE_REASON);
            }
        }

        if session.is_empty() {
            self.store.remove(session_id);
            true
        } else {
            false
        }
    }

    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let evicted = self.store.evict_expired(now).len();
        if evicted > 0 {
            info!(evicted, remaining = self.store.len(), "Evicted idle sessions");
        }
        evicted
    }
}
