//! Session persistence seam.
//!
//! The service talks to storage only through [`SessionStore`]. Two
//! implementations ship: [`MemorySessionStore`] for tests and single-process
//! play, and [`crate::db::SqliteSessionStore`] for durable storage.
//!
//! Every store assigns `version` and the timestamps itself. `add` stores
//! version 1; `update` succeeds only if the caller's version matches the
//! stored one and bumps it, so two writers racing on the same session
//! cannot both win.

mod memory;

pub use memory::MemorySessionStore;

use async_trait::async_trait;
use tictactoe_core::{Session, SessionError, SessionState};

/// Storage for game sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session, or `None` if the id is unknown.
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>, SessionError>;

    /// Stores a new session and returns it with version and timestamps set.
    ///
    /// Fails with `Conflict` if the id is already taken.
    async fn add(&self, session: Session) -> Result<Session, SessionError>;

    /// Replaces a stored session and returns it with the bumped version.
    ///
    /// Fails with `NotFound` for an unknown id and `Conflict` if the stored
    /// version differs from `session.version()`.
    async fn update(&self, session: Session) -> Result<Session, SessionError>;

    /// Removes a session. Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: &str) -> Result<(), SessionError>;

    /// Two-player sessions `user_id` could join, most recently updated first.
    async fn available_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError>;

    /// Sessions seating `user_id`, most recently updated first.
    async fn user_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError>;

    /// Finished sessions seating `user_id`, most recently updated first.
    async fn finished_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError>;
}

/// True if `user_id` could join `session`.
pub fn is_available_for(session: &Session, user_id: &str) -> bool {
    *session.state() == SessionState::WaitingForPlayers
        && !session.is_full()
        && !session.is_seated(user_id)
}

/// True if `session` is over and seats `user_id`.
pub fn is_finished_for(session: &Session, user_id: &str) -> bool {
    session.state().is_terminal() && session.is_seated(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::{Difficulty, Mode, Seat};

    fn open_session() -> Session {
        Session::new(
            "s".to_string(),
            Mode::TwoPlayers,
            Difficulty::Hard,
            Some(Seat::Player1),
            "alice".to_string(),
        )
    }

    #[test]
    fn test_open_session_is_available_to_others_only() {
        let session = open_session();
        assert!(is_available_for(&session, "bob"));
        assert!(!is_available_for(&session, "alice"));
    }

    #[test]
    fn test_full_or_started_session_is_not_available() {
        let full = open_session().with_player2_id(Some("bob".to_string()));
        assert!(!is_available_for(&full, "carol"));

        let started = open_session().with_state(SessionState::Player1Turn);
        assert!(!is_available_for(&started, "carol"));
    }

    #[test]
    fn test_finished_requires_terminal_state_and_seat() {
        let session = open_session().with_state(SessionState::Draw);
        assert!(is_finished_for(&session, "alice"));
        assert!(!is_finished_for(&session, "bob"));
        assert!(!is_finished_for(&open_session(), "alice"));
    }
}
