use crate::domain::Session;
use crate::error::{RelayError, Result};
use phonedrop_core::SessionId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Sessions idle for longer than this are evicted
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Upper bound on live sessions held by one store
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

pub const EXPIRED_CLOSE_CODE: u16 = 1001;
pub const EXPIRED_CLOSE_REASON: &str = "Session expired";

/// In-memory session map owned by a single relay actor
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
    inactivity_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_INACTIVITY_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(inactivity_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            inactivity_timeout,
            max_sessions,
        }
    }

    pub fn inactivity_timeout(&self) -> Duration {
        self.inactivity_timeout
    }

    /// Existing session, or a new empty one if capacity allows
    pub fn get_or_create(&mut self, id: &SessionId, now: Instant) -> Result<&mut Session> {
        if !self.sessions.contains_key(id) {
            if self.sessions.len() >= self.max_sessions {
                return Err(RelayError::LimitReached(self.max_sessions));
            }
            debug!(session = %id.short(), "Creating session");
            self.sessions
                .insert(id.clone(), Session::new(id.clone(), now));
        }

        self.sessions
            .get_mut(id)
            .ok_or_else(|| RelayError::Internal("session vanished after insert".to_string()))
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn touch(&mut self, id: &SessionId, now: Instant) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.touch(now);
        }
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let removed = self.sessions.remove(id);
        if removed.is_some() {
            debug!(session = %id.short(), "Session removed");
        }
        removed
    }

    /// Drop every session idle for strictly longer than the timeout,
    /// closing its links with 1001
    pub fn evict_expired(&mut self, now: Instant) -> Vec<SessionId> {
        let timeout = self.inactivity_timeout;
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|session| session.idle_for(now) > timeout)
            .map(|session| session.id().clone())
            .collect();

        for id in &expired {
            if let Some(mut session) = self.sessions.remove(id) {
                session.close_all(EXPIRED_CLOSE_CODE, EXPIRED_CLOSE_REASON);
                info!(session = %id.short(), "Session expired");
            }
        }

        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
