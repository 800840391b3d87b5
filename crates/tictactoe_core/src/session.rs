//! The session aggregate and its state transitions.
//!
//! Every transition here is pure: it takes the session as loaded from
//! storage, checks the acting user's entitlement, and mutates the value in
//! place. Nothing is partially applied; each method validates fully before
//! touching any field. Persisting and broadcasting the result is the
//! caller's job.

use crate::ai;
use crate::board::{Board, Cell};
use crate::error::SessionError;
use crate::rules::{WinningLine, evaluate, winning_line};
use crate::state::{Difficulty, Mode, Seat, SessionState};
use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_setters::Setters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Unique identifier for a user, already verified by the caller.
pub type UserId = String;

/// Generates a fresh random session id (32 hex characters).
pub fn new_session_id<R: Rng + ?Sized>(rng: &mut R) -> SessionId {
    let bytes: [u8; 16] = rng.r#gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One game of tic-tac-toe between two seats.
///
/// Player 1 always plays X and Player 2 always plays O, whichever user
/// occupies the seat. `version` and the timestamps belong to the storage
/// layer; the engine never changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct Session {
    id: SessionId,
    creator_id: UserId,
    mode: Mode,
    difficulty: Difficulty,
    board: Board,
    state: SessionState,
    player1_id: Option<UserId>,
    player2_id: Option<UserId>,
    winning_line: Option<WinningLine>,
    version: i32,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl Session {
    /// Creates a session in its initial state.
    ///
    /// The creator takes `seat` if given. One-player sessions always seat
    /// the creator, defaulting to Player 1.
    #[instrument(skip(id, creator_id), fields(session_id = %id, creator_id = %creator_id))]
    pub fn new(
        id: SessionId,
        mode: Mode,
        difficulty: Difficulty,
        seat: Option<Seat>,
        creator_id: UserId,
    ) -> Self {
        let seat = match mode {
            Mode::OnePlayer => Some(seat.unwrap_or(Seat::Player1)),
            Mode::TwoPlayers => seat,
        };
        let player1_id = (seat == Some(Seat::Player1)).then(|| creator_id.clone());
        let player2_id = (seat == Some(Seat::Player2)).then(|| creator_id.clone());

        debug!(?mode, ?difficulty, ?seat, "Creating session");
        Self {
            id,
            creator_id,
            mode,
            difficulty,
            board: Board::new(),
            state: SessionState::initial(mode),
            player1_id,
            player2_id,
            winning_line: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// User sitting in `seat`, if any.
    pub fn player(&self, seat: Seat) -> Option<&str> {
        match seat {
            Seat::Player1 => self.player1_id.as_deref(),
            Seat::Player2 => self.player2_id.as_deref(),
        }
    }

    /// Seat occupied by `user_id`, Player 1 checked first.
    pub fn seat_of(&self, user_id: &str) -> Option<Seat> {
        if self.player1_id.as_deref() == Some(user_id) {
            Some(Seat::Player1)
        } else if self.player2_id.as_deref() == Some(user_id) {
            Some(Seat::Player2)
        } else {
            None
        }
    }

    /// True if `user_id` occupies either seat.
    pub fn is_seated(&self, user_id: &str) -> bool {
        self.seat_of(user_id).is_some()
    }

    /// True if both seats are taken.
    pub fn is_full(&self) -> bool {
        self.player1_id.is_some() && self.player2_id.is_some()
    }

    /// True if `user_id` created the session.
    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }

    /// User who won, if the game ended with a winner and that seat is filled.
    pub fn winner_id(&self) -> Option<&str> {
        match self.state {
            SessionState::Player1Winner => self.player(Seat::Player1),
            SessionState::Player2Winner => self.player(Seat::Player2),
            _ => None,
        }
    }

    /// Replaces the board. Used by the move validator once a diff is accepted.
    pub(crate) fn replace_board(&mut self, board: Board) {
        self.board = board;
    }

    /// Seats `user_id` in the first open seat (Player 1 first).
    ///
    /// A session waiting for players moves to the turn implied by the
    /// board; a session already in a turn keeps it.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the session is not a two-player session, the user
    /// is already seated, or both seats are taken.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn add_player(&mut self, user_id: &str) -> Result<Seat, SessionError> {
        if self.mode != Mode::TwoPlayers {
            warn!(mode = %self.mode, "Join attempted on non two-player session");
            return Err(SessionError::invalid_state(format!(
                "Invalid session mode: {}",
                self.mode
            )));
        }

        if self.is_seated(user_id) {
            warn!("User already seated");
            return Err(SessionError::invalid_state(format!(
                "User {} already in session",
                user_id
            )));
        }

        let seat = match (&self.player1_id, &self.player2_id) {
            (None, _) => Seat::Player1,
            (Some(_), None) => Seat::Player2,
            (Some(_), Some(_)) => {
                warn!("Session already has 2 players");
                return Err(SessionError::invalid_state(format!(
                    "Session {} is full",
                    self.id
                )));
            }
        };

        match seat {
            Seat::Player1 => self.player1_id = Some(user_id.to_string()),
            Seat::Player2 => self.player2_id = Some(user_id.to_string()),
        }

        if self.state == SessionState::WaitingForPlayers {
            self.state = SessionState::turn_of(self.board.next_mark());
        }

        info!(?seat, state = %self.state, "Player joined session");
        Ok(seat)
    }

    /// Advances the game after a validated move has been applied to the board.
    ///
    /// Two-player sessions either finish or hand the turn over. One-player
    /// sessions finish, or let the AI reply with the mark opposite the
    /// creator's seat and then hand the turn back to the human. The AI only
    /// moves when the mark counts say it is the AI's turn, which is how it
    /// opens when the human sits in Player 2's seat; an unchanged board on
    /// the human's turn leaves the session as it was.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a one-player session has no seated creator.
    #[instrument(skip(self, rng), fields(session_id = %self.id, mode = %self.mode, state = %self.state))]
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SessionError> {
        if self.state == SessionState::WaitingForPlayers {
            debug!("Session waiting for players, nothing to advance");
            return Ok(());
        }

        match self.mode {
            Mode::TwoPlayers => {
                self.settle_turn();
            }
            Mode::OnePlayer => {
                let after_human = evaluate(&self.board, self.state);
                if !after_human.is_turn() {
                    self.finish(after_human);
                    return Ok(());
                }

                let human = self
                    .seat_of(&self.creator_id)
                    .map(Seat::mark)
                    .ok_or_else(|| SessionError::invalid_state("Creator is not seated"))?;
                let ai_mark = human.opponent();

                if self.board.next_mark() != ai_mark {
                    debug!(mark = %human, "Human has not moved, AI waits");
                    self.state = SessionState::turn_of(human);
                    return Ok(());
                }
                self.state = SessionState::turn_of(ai_mark);

                if let Some(point) = ai::choose_move(&self.board, ai_mark, self.difficulty, rng) {
                    debug!(%point, mark = %ai_mark, "AI placed mark");
                    self.board.set(point, Cell::Occupied(ai_mark));
                }

                self.settle_turn();
            }
        }

        info!(state = %self.state, board = %self.board.to_compact(), "Session advanced");
        Ok(())
    }

    /// Finishes the game if the board is decided, otherwise passes the turn.
    fn settle_turn(&mut self) {
        let next = evaluate(&self.board, self.state);
        if next.is_turn() {
            self.state = self.state.flipped();
        } else {
            self.finish(next);
        }
    }

    fn finish(&mut self, state: SessionState) {
        self.state = state;
        self.winning_line = winning_line(&self.board);
        info!(state = %state, line = ?self.winning_line, "Game finished");
    }

    /// Switches between one-player and two-player mode.
    ///
    /// Returns `false` if the mode was already `mode`. Switching to
    /// one-player vacates the seat the creator does not occupy; switching to
    /// two-player reopens the session for joining.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the acting user is the seated creator,
    /// `InvalidState` once the game is over.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn change_mode(&mut self, user_id: &str, mode: Mode) -> Result<bool, SessionError> {
        if !self.is_creator(user_id) {
            warn!("Non-creator attempted mode change");
            return Err(SessionError::forbidden(
                "User is not allowed to modify session",
            ));
        }

        if !self.is_seated(user_id) {
            warn!("Unseated creator attempted mode change");
            return Err(SessionError::forbidden("User is not seated in session"));
        }

        if self.state.is_terminal() {
            return Err(SessionError::invalid_state("Game is over"));
        }

        if self.mode == mode {
            debug!(%mode, "Mode unchanged");
            return Ok(false);
        }

        match mode {
            Mode::OnePlayer => {
                if self.seat_of(user_id) == Some(Seat::Player1) {
                    self.player2_id = None;
                } else {
                    self.player1_id = None;
                }
                if self.state == SessionState::WaitingForPlayers {
                    self.state = SessionState::Player1Turn;
                }
            }
            Mode::TwoPlayers => {
                self.state = SessionState::WaitingForPlayers;
            }
        }

        self.mode = mode;
        info!(%mode, state = %self.state, "Session mode changed");
        Ok(true)
    }

    /// Clears the board and restarts with Player 1 to move.
    ///
    /// Mode, difficulty and seats are kept.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the acting user is the creator (one-player) or a
    /// seated player (two-player).
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn reset(&mut self, user_id: &str) -> Result<(), SessionError> {
        let allowed = match self.mode {
            Mode::OnePlayer => self.is_creator(user_id),
            Mode::TwoPlayers => self.is_seated(user_id),
        };
        if !allowed {
            warn!("User not allowed to reset session");
            return Err(SessionError::forbidden(
                "User is not allowed to modify session",
            ));
        }

        self.board.clear();
        self.winning_line = None;
        self.state = SessionState::Player1Turn;
        info!("Session reset");
        Ok(())
    }
}
