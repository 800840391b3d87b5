//! Push notifications to the participants of a session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tictactoe_core::{Session, SessionError, SessionId};
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// Why a session update was pushed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateKind {
    /// A second player took a seat.
    PlayerJoined,
    /// A move was accepted.
    MoveMade,
    /// The board was cleared.
    Reset,
}

/// A pushed session update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// What happened.
    pub kind: UpdateKind,
    /// The session as persisted after the change.
    pub session: Session,
}

/// Delivers session updates to whoever is watching a session.
#[async_trait]
pub trait SessionNotifier: Send + Sync {
    /// Pushes `update` to every listener of its session.
    ///
    /// Having no listeners is not an error.
    async fn notify(&self, update: SessionUpdate) -> Result<(), SessionError>;

    /// Tells listeners a session is gone and no more updates will follow.
    async fn closed(&self, _session_id: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Per-session broadcast channels.
///
/// Each session id gets its own channel the first time someone subscribes.
/// Clones share the same channels.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    capacity: usize,
    channels: Arc<Mutex<HashMap<SessionId, broadcast::Sender<SessionUpdate>>>>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(BroadcastHub::DEFAULT_CAPACITY)
    }
}

impl BroadcastHub {
    /// Buffered updates per session before slow receivers start lagging.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Creates a hub whose channels buffer `capacity` updates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<SessionId, broadcast::Sender<SessionUpdate>>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribes to updates of one session.
    #[instrument(skip(self))]
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<SessionUpdate> {
        let mut channels = self.channels();
        let sender = channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        debug!(receivers = sender.receiver_count() + 1, "Subscribed to session");
        sender.subscribe()
    }

    /// Number of live receivers for a session.
    pub fn receiver_count(&self, session_id: &str) -> usize {
        self.channels()
            .get(session_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drops the channel of a session, closing every receiver.
    pub fn close(&self, session_id: &str) {
        if self.channels().remove(session_id).is_some() {
            debug!(session_id, "Session channel closed");
        }
    }
}

#[async_trait]
impl SessionNotifier for BroadcastHub {
    #[instrument(skip(self, update), fields(session_id = %update.session.id(), kind = %update.kind))]
    async fn notify(&self, update: SessionUpdate) -> Result<(), SessionError> {
        let mut channels = self.channels();
        let session_id = update.session.id().clone();
        let Some(sender) = channels.get(&session_id) else {
            trace!("No listeners");
            return Ok(());
        };

        match sender.send(update) {
            Ok(delivered) => debug!(delivered, "Session update sent"),
            Err(_) => {
                trace!("All listeners gone, dropping channel");
                channels.remove(&session_id);
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn closed(&self, session_id: &str) -> Result<(), SessionError> {
        self.close(session_id);
        Ok(())
    }
}
