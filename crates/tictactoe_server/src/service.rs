//! Session orchestration over a store and a notifier.
//!
//! Each operation loads the session, runs the engine transition, persists
//! the result and, where other participants need to know, pushes an update.
//! A failed step leaves the stored session untouched.

use std::sync::{Mutex, MutexGuard};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tictactoe_core::{
    Board, Difficulty, Mode, Seat, Session, SessionError, SessionState, WinRatio,
    new_session_id, validate_move,
};
use tracing::{debug, info, instrument, warn};

use crate::notify::{SessionNotifier, SessionUpdate, UpdateKind};
use crate::store::SessionStore;

/// Game session service.
#[derive(Debug)]
pub struct SessionService<S, N> {
    store: S,
    notifier: N,
    rng: Mutex<StdRng>,
}

impl<S: SessionStore, N: SessionNotifier> SessionService<S, N> {
    /// Creates a service seeded from the operating system.
    #[instrument(skip_all)]
    pub fn new(store: S, notifier: N) -> Self {
        Self::with_rng(store, notifier, StdRng::from_entropy())
    }

    /// Creates a service with a fixed seed, for reproducible AI play.
    #[instrument(skip(store, notifier))]
    pub fn with_seed(store: S, notifier: N, seed: u64) -> Self {
        Self::with_rng(store, notifier, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: S, notifier: N, rng: StdRng) -> Self {
        Self {
            store,
            notifier,
            rng: Mutex::new(rng),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load(&self, session_id: &str) -> Result<Session, SessionError> {
        self.store
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| SessionError::not_found(format!("Session {} not found", session_id)))
    }

    /// Pushes an update. The change is already stored, so a failed push is
    /// only logged.
    async fn publish(&self, kind: UpdateKind, session: &Session) {
        let update = SessionUpdate {
            kind,
            session: session.clone(),
        };
        if let Err(e) = self.notifier.notify(update).await {
            warn!(session_id = %session.id(), %kind, error = %e, "Failed to push session update");
        }
    }

    /// Creates and stores a new session.
    ///
    /// `seat` picks the creator's seat; one-player sessions default to
    /// Player 1 and two-player sessions leave the creator unseated when it
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Fails only if the store does.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        mode: Mode,
        difficulty: Difficulty,
        seat: Option<Seat>,
        creator_id: &str,
    ) -> Result<Session, SessionError> {
        let id = new_session_id(&mut *self.rng());
        let session = Session::new(id, mode, difficulty, seat, creator_id.to_string());
        let stored = self.store.add(session).await?;
        info!(session_id = %stored.id(), %mode, state = %stored.state(), "Session created");
        Ok(stored)
    }

    /// Looks a session up.
    ///
    /// # Errors
    ///
    /// Fails only if the store does.
    #[instrument(skip(self))]
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, SessionError> {
        self.store.get_by_id(session_id).await
    }

    /// Seats a second player and tells the participants.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown session, `InvalidState` if the user cannot
    /// join, `Conflict` if the session changed concurrently.
    #[instrument(skip(self))]
    pub async fn add_player_to_session(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Session, SessionError> {
        let mut session = self.load(session_id).await?;
        let seat = session.add_player(user_id)?;
        let stored = self.store.update(session).await?;
        info!(?seat, state = %stored.state(), "Player added");
        self.publish(UpdateKind::PlayerJoined, &stored).await;
        Ok(stored)
    }

    /// Checks a submitted board without applying it.
    ///
    /// Returns the session carrying the submitted board, ready for
    /// [`SessionService::make_move`].
    ///
    /// # Errors
    ///
    /// See [`validate_move`].
    #[instrument(skip(self, board), fields(board = %board.to_compact()))]
    pub async fn validate_move(
        &self,
        user_id: &str,
        session_id: &str,
        board: &Board,
    ) -> Result<Session, SessionError> {
        let stored = self.store.get_by_id(session_id).await?;
        validate_move(stored, board, user_id)
    }

    /// Advances a validated session and persists it.
    ///
    /// In one-player mode this is where the AI replies. Two-player updates
    /// are pushed to the participants. A session still waiting for players
    /// is returned as is without touching the store.
    ///
    /// # Errors
    ///
    /// `InvalidState` from the engine, `NotFound` or `Conflict` from the store.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn make_move(&self, mut session: Session) -> Result<Session, SessionError> {
        if *session.state() == SessionState::WaitingForPlayers {
            debug!("Session waiting for players, move ignored");
            return Ok(session);
        }

        {
            let mut rng = self.rng();
            session.advance(&mut *rng)?;
        }

        let stored = self.store.update(session).await?;
        if *stored.mode() == Mode::TwoPlayers {
            self.publish(UpdateKind::MoveMade, &stored).await;
        }
        info!(state = %stored.state(), board = %stored.board().to_compact(), "Move made");
        Ok(stored)
    }

    /// Validates and applies a move in one call.
    ///
    /// # Errors
    ///
    /// Anything [`SessionService::validate_move`] or
    /// [`SessionService::make_move`] reports.
    #[instrument(skip(self, board), fields(board = %board.to_compact()))]
    pub async fn submit_move(
        &self,
        user_id: &str,
        session_id: &str,
        board: &Board,
    ) -> Result<Session, SessionError> {
        let session = self.validate_move(user_id, session_id, board).await?;
        self.make_move(session).await
    }

    /// Switches a session between one-player and two-player mode.
    ///
    /// Nothing is written when the mode is already `mode`.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` or `InvalidState` as the engine decides.
    #[instrument(skip(self))]
    pub async fn update_session_mode(
        &self,
        session_id: &str,
        user_id: &str,
        mode: Mode,
    ) -> Result<Session, SessionError> {
        let mut session = self.load(session_id).await?;
        if !session.change_mode(user_id, mode)? {
            return Ok(session);
        }
        let stored = self.store.update(session).await?;
        info!(%mode, state = %stored.state(), "Session mode updated");
        Ok(stored)
    }

    /// Clears the board for a rematch.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Forbidden` as the engine decides.
    #[instrument(skip(self))]
    pub async fn reset_session(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Session, SessionError> {
        let mut session = self.load(session_id).await?;
        session.reset(user_id)?;
        let stored = self.store.update(session).await?;
        if *stored.mode() == Mode::TwoPlayers {
            self.publish(UpdateKind::Reset, &stored).await;
        }
        info!("Session reset");
        Ok(stored)
    }

    /// Deletes a session. Only its creator may do so. Listeners of the
    /// session are closed once the delete is stored.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown session, `Forbidden` for anyone else.
    #[instrument(skip(self))]
    pub async fn delete_session(&self, session_id: &str, user_id: &str) -> Result<(), SessionError> {
        let session = self.load(session_id).await?;
        if !session.is_creator(user_id) {
            warn!("Non-creator attempted delete");
            return Err(SessionError::forbidden(
                "Only the creator may delete a session",
            ));
        }
        self.store.delete(session_id).await?;
        if let Err(e) = self.notifier.closed(session_id).await {
            warn!(error = %e, "Failed to close session listeners");
        }
        info!("Session deleted");
        Ok(())
    }

    /// Two-player sessions the user could join.
    ///
    /// # Errors
    ///
    /// Fails only if the store does.
    #[instrument(skip(self))]
    pub async fn get_available_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        self.store.available_sessions(user_id).await
    }

    /// Sessions the user is seated in.
    ///
    /// # Errors
    ///
    /// Fails only if the store does.
    #[instrument(skip(self))]
    pub async fn get_user_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        self.store.user_sessions(user_id).await
    }

    /// Finished sessions the user was seated in.
    ///
    /// # Errors
    ///
    /// Fails only if the store does.
    #[instrument(skip(self))]
    pub async fn get_finished_sessions(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        self.store.finished_sessions(user_id).await
    }

    /// Win ratio over the user's finished sessions.
    ///
    /// # Errors
    ///
    /// Fails only if the store does.
    #[instrument(skip(self))]
    pub async fn win_ratio(&self, user_id: &str, login: &str) -> Result<WinRatio, SessionError> {
        let finished = self.store.finished_sessions(user_id).await?;
        Ok(WinRatio::compute(user_id, login, &finished))
    }
}
