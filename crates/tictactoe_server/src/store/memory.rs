//! In-memory session store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tictactoe_core::{Session, SessionError, SessionId};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{SessionStore, is_available_for, is_finished_for};

/// Session store backed by a shared map.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        debug!("Creating in-memory session store");
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn select(&self, keep: impl Fn(&Session) -> bool) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut selected: Vec<Session> = sessions.values().filter(|s| keep(s)).cloned().collect();
        selected.sort_by(|a, b| {
            b.updated_at()
                .cmp(a.updated_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        selected
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    async fn add(&self, session: Session) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            warn!("Session id already stored");
            return Err(SessionError::conflict(format!(
                "Session {} already exists",
                session.id()
            )));
        }

        let now = now();
        let stored = session
            .with_version(1)
            .with_created_at(Some(now))
            .with_updated_at(Some(now));
        sessions.insert(stored.id().clone(), stored.clone());
        debug!("Session stored");
        Ok(stored)
    }

    #[instrument(skip(self, session), fields(session_id = %session.id(), version = %session.version()))]
    async fn update(&self, session: Session) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let Some(current) = sessions.get(session.id()) else {
            return Err(SessionError::not_found(format!(
                "Session {} not found",
                session.id()
            )));
        };

        if current.version() != session.version() {
            warn!(stored = %current.version(), "Stale session version");
            return Err(SessionError::conflict(format!(
                "Session {} was modified concurrently",
                session.id()
            )));
        }

        let created_at = *current.created_at();
        let version = session.version() + 1;
        let stored = session
            .with_version(version)
            .with_created_at(created_at)
            .with_updated_at(Some(now()));
        sessions.insert(stored.id().clone(), stored.clone());
        debug!(version, "Session updated");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), SessionError> {
        match self.sessions.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(SessionError::not_found(format!("Session {} not found", id))),
        }
    }

    #[instrument(skip(self))]
    async fn available_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        Ok(self.select(|s| is_available_for(s, user_id)).await)
    }

    #[instrument(skip(self))]
    async fn user_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        Ok(self.select(|s| s.is_seated(user_id)).await)
    }

    #[instrument(skip(self))]
    async fn finished_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        Ok(self.select(|s| is_finished_for(s, user_id)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::{Difficulty, Mode, Seat, SessionErrorKind, SessionState};

    fn session(id: &str, creator: &str) -> Session {
        Session::new(
            id.to_string(),
            Mode::TwoPlayers,
            Difficulty::Hard,
            Some(Seat::Player1),
            creator.to_string(),
        )
    }

    #[tokio::test]
    async fn test_add_sets_version_and_timestamps() {
        let store = MemorySessionStore::new();
        let stored = store.add(session("a", "alice")).await.unwrap();
        assert_eq!(*stored.version(), 1);
        assert!(stored.created_at().is_some());
        assert_eq!(stored.created_at(), stored.updated_at());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_add_conflicts() {
        let store = MemorySessionStore::new();
        store.add(session("a", "alice")).await.unwrap();
        let err = store.add(session("a", "bob")).await.unwrap_err();
        assert!(matches!(err.kind, SessionErrorKind::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_keeps_created_at() {
        let store = MemorySessionStore::new();
        let stored = store.add(session("a", "alice")).await.unwrap();
        let updated = store
            .update(stored.clone().with_state(SessionState::Player1Turn))
            .await
            .unwrap();
        assert_eq!(*updated.version(), 2);
        assert_eq!(updated.created_at(), stored.created_at());
        assert_eq!(
            *store.get_by_id("a").await.unwrap().unwrap().state(),
            SessionState::Player1Turn
        );
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = MemorySessionStore::new();
        let stored = store.add(session("a", "alice")).await.unwrap();
        store.update(stored.clone()).await.unwrap();
        let err = store.update(stored).await.unwrap_err();
        assert!(matches!(err.kind, SessionErrorKind::Conflict(_)));
        assert!(err.kind.to_string().starts_with("Conflict"));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let store = MemorySessionStore::new();
        assert!(store.get_by_id("nope").await.unwrap().is_none());
        let err = store.update(session("nope", "alice")).await.unwrap_err();
        assert!(matches!(err.kind, SessionErrorKind::NotFound(_)));
        let err = store.delete("nope").await.unwrap_err();
        assert!(matches!(err.kind, SessionErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_queries_filter_by_user() {
        let store = MemorySessionStore::new();
        store.add(session("open", "alice")).await.unwrap();
        store
            .add(
                session("done", "alice")
                    .with_player2_id(Some("bob".to_string()))
                    .with_state(SessionState::Draw),
            )
            .await
            .unwrap();

        let available = store.available_sessions("bob").await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id(), "open");
        assert!(store.available_sessions("alice").await.unwrap().is_empty());

        assert_eq!(store.user_sessions("alice").await.unwrap().len(), 2);
        assert_eq!(store.user_sessions("bob").await.unwrap().len(), 1);

        let finished = store.finished_sessions("bob").await.unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id(), "done");
    }
}
