use super::relay::{Accepted, SignalingRelay};
use super::store::SessionStore;
use crate::config::RelayConfig;
use crate::domain::{LinkId, Outbound};
use crate::error::{RelayError, Result};
use phonedrop_core::{Role, SessionId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

const COMMAND_BUFFER: usize = 256;

/// Work items for a relay actor
#[derive(Debug)]
pub enum RelayCommand {
    Accept {
        session_id: String,
        sender: mpsc::Sender<Outbound>,
        reply: oneshot::Sender<Result<Accepted>>,
    },
    Relay {
        session_id: SessionId,
        role: Role,
        link_id: LinkId,
        text: String,
    },
    Disconnect {
        session_id: SessionId,
        role: Role,
        link_id: LinkId,
    },
    SessionCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Single task that owns a [`SignalingRelay`] and its sessions.
///
/// Commands are handled one at a time; the eviction sweep shares the same
/// loop so it never interleaves with a half-handled command.
pub struct RelayActor {
    shard: usize,
    relay: SignalingRelay,
    commands: mpsc::Receiver<RelayCommand>,
    eviction_interval: Duration,
}

impl RelayActor {
    pub fn new(
        shard: usize,
        relay: SignalingRelay,
        commands: mpsc::Receiver<RelayCommand>,
        eviction_interval: Duration,
    ) -> Self {
        Self {
            shard,
            relay,
            commands,
            eviction_interval,
        }
    }

    #[instrument(skip(self), fields(shard = self.shard))]
    pub async fn run(mut self) {
        debug!("Relay actor started");
        let mut eviction = tokio::time::interval(self.eviction_interval);
        eviction.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        eviction.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = eviction.tick() => {
                    self.relay.evict_expired(Instant::now());
                }
            }
        }

        info!(
            sessions = self.relay.session_count(),
            "Relay actor stopped"
        );
    }

    fn handle(&mut self, command: RelayCommand) {
        let now = Instant::now();
        match command {
            RelayCommand::Accept {
                session_id,
                sender,
                reply,
            } => {
                let result = self.relay.accept(&session_id, sender, now);
                if let Err(Ok(accepted)) = reply.send(result) {
                    // the caller went away before learning its role
                    if let Ok(id) = SessionId::parse(&session_id) {
                        warn!(session = %id.short(), "Accept abandoned, releasing link");
                        self.relay
                            .disconnect(&id, accepted.role, accepted.link_id, now);
                    }
                }
            }
            RelayCommand::Relay {
                session_id,
                role,
                link_id,
                text,
            } => {
                self.relay.relay(&session_id, role, link_id, &text, now);
            }
            RelayCommand::Disconnect {
                session_id,
                role,
                link_id,
            } => {
                self.relay.disconnect(&session_id, role, link_id, now);
            }
            RelayCommand::SessionCount { reply } => {
                let _ = reply.send(self.relay.session_count());
            }
        }
    }
}

/// Clonable front to the pool of relay actors.
///
/// Every session id maps to one fixed actor, so all operations on a session
/// are serialized by that actor.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    shards: Arc<[mpsc::Sender<RelayCommand>]>,
}

impl RelayHandle {
    /// Start one actor per configured shard on the current runtime
    pub fn spawn(config: &RelayConfig) -> Self {
        let shards: Vec<_> = (0..config.shard_count())
            .map(|shard| {
                let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
                let store = SessionStore::new(config.inactivity_timeout(), config.max_sessions);
                let actor = RelayActor::new(
                    shard,
                    SignalingRelay::new(store),
                    rx,
                    config.eviction_interval(),
                );
                tokio::spawn(actor.run());
                tx
            })
            .collect();

        info!(shards = shards.len(), "Relay actors started");
        Self {
            shards: shards.into(),
        }
    }

    fn shard(&self, session_id: &str) -> &mpsc::Sender<RelayCommand> {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    async fn submit(&self, session_id: &str, command: RelayCommand) -> Result<()> {
        self.shard(session_id)
            .send(command)
            .await
            .map_err(|_| RelayError::RelayUnavailable)
    }

    pub async fn accept(&self, session_id: &str, sender: mpsc::Sender<Outbound>) -> Result<Accepted> {
        let (reply, response) = oneshot::channel();
        self.submit(
            session_id,
            RelayCommand::Accept {
                session_id: session_id.to_string(),
                sender,
                reply,
            },
        )
        .await?;
        response.await.map_err(|_| RelayError::RelayUnavailable)?
    }

    pub async fn relay(
        &self,
        session_id: &SessionId,
        role: Role,
        link_id: LinkId,
        text: String,
    ) -> Result<()> {
        self.submit(
            session_id.as_str(),
            RelayCommand::Relay {
                session_id: session_id.clone(),
                role,
                link_id,
                text,
            },
        )
        .await
    }

    pub async fn disconnect(&self, session_id: &SessionId, role: Role, link_id: LinkId) -> Result<()> {
        self.submit(
            session_id.as_str(),
            RelayCommand::Disconnect {
                session_id: session_id.clone(),
                role,
                link_id,
            },
        )
        .await
    }

    /// Live sessions across all actors
    pub async fn session_count(&self) -> Result<usize> {
        let mut total = 0;
        for shard in self.shards.iter() {
            let (reply, response) = oneshot::channel();
            shard
                .send(RelayCommand::SessionCount { reply })
                .await
                .map_err(|_| RelayError::RelayUnavailable)?;
            total += response.await.map_err(|_| RelayError::RelayUnavailable)?;
        }
        Ok(total)
    }
}
