use super::{Link, LinkId};
use phonedrop_core::{Role, SessionId};
use std::time::Duration;
use tokio::time::Instant;

/// A pairing of at most one initiator and one responder link
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    initiator: Option<Link>,
    responder: Option<Link>,
    created_at: Instant,
    last_activity_at: Instant,
}

impl Session {
    pub fn new(id: SessionId, now: Instant) -> Self {
        Session {
            id,
            initiator: None,
            responder: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_activity_at(&self) -> Instant {
        self.last_activity_at
    }

    pub fn link(&self, role: Role) -> Option<&Link> {
        match role {
            Role::Initiator => self.initiator.as_ref(),
            Role::Responder => self.responder.as_ref(),
        }
    }

    fn slot(&mut self, role: Role) -> &mut Option<Link> {
        match role {
            Role::Initiator => &mut self.initiator,
            Role::Responder => &mut self.responder,
        }
    }

    /// The role the next device would get: initiator first, then responder
    pub fn free_role(&self) -> Option<Role> {
        if self.initiator.is_none() {
            Some(Role::Initiator)
        } else if self.responder.is_none() {
            Some(Role::Responder)
        } else {
            None
        }
    }

    pub fn attach(&mut self, role: Role, link: Link) {
        *self.slot(role) = Some(link);
    }

    /// Clear `role` only while it still holds `link_id`
    pub fn detach(&mut self, role: Role, link_id: LinkId) -> Option<Link> {
        let slot = self.slot(role);
        if slot.as_ref().map(Link::id) == Some(link_id) {
            slot.take()
        } else {
            None
        }
    }

    /// Unconditionally release a role's link
    pub fn release(&mut self, role: Role) -> Option<Link> {
        self.slot(role).take()
    }

    pub fn holds(&self, role: Role, link_id: LinkId) -> bool {
        self.link(role).map(Link::id) == Some(link_id)
    }

    pub fn is_empty(&self) -> bool {
        self.initiator.is_none() && self.responder.is_none()
    }

    pub fn touch(&mut self, now: Instant) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity_at)
    }

    /// Close every present link with the given code and release them
    pub fn close_all(&mut self, code: u16, reason: &str) {
        for link in [self.initiator.take(), self.responder.take()]
            .into_iter()
            .flatten()
        {
            link.close(code, reason);
        }
    }
}
