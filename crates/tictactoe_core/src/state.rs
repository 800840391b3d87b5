//! Session state machine vocabulary: states, modes, difficulties and seats.

use crate::board::Mark;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Two-player session with an open seat.
    WaitingForPlayers,
    /// Player 1 (X) moves next.
    Player1Turn,
    /// Player 2 (O) moves next.
    Player2Turn,
    /// Board filled with no winner.
    Draw,
    /// Player 1 completed a line.
    Player1Winner,
    /// Player 2 completed a line.
    Player2Winner,
}

impl SessionState {
    /// Initial state for a freshly created session.
    pub fn initial(mode: Mode) -> Self {
        match mode {
            Mode::OnePlayer => SessionState::Player1Turn,
            Mode::TwoPlayers => SessionState::WaitingForPlayers,
        }
    }

    /// True for `Player1Turn` and `Player2Turn`.
    pub fn is_turn(self) -> bool {
        matches!(self, SessionState::Player1Turn | SessionState::Player2Turn)
    }

    /// True once the game has been won or drawn.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Draw | SessionState::Player1Winner | SessionState::Player2Winner
        )
    }

    /// Mark of the side to move, if this is a turn state.
    pub fn mark_to_move(self) -> Option<Mark> {
        match self {
            SessionState::Player1Turn => Some(Mark::X),
            SessionState::Player2Turn => Some(Mark::O),
            SessionState::WaitingForPlayers
            | SessionState::Draw
            | SessionState::Player1Winner
            | SessionState::Player2Winner => None,
        }
    }

    /// Turn state in which `mark` moves.
    pub fn turn_of(mark: Mark) -> Self {
        match mark {
            Mark::X => SessionState::Player1Turn,
            Mark::O => SessionState::Player2Turn,
        }
    }

    /// Terminal state in which `mark` has won.
    pub fn winner(mark: Mark) -> Self {
        match mark {
            Mark::X => SessionState::Player1Winner,
            Mark::O => SessionState::Player2Winner,
        }
    }

    /// Swaps `Player1Turn` and `Player2Turn`; any other state is unchanged.
    pub fn flipped(self) -> Self {
        match self {
            SessionState::Player1Turn => SessionState::Player2Turn,
            SessionState::Player2Turn => SessionState::Player1Turn,
            other => other,
        }
    }
}

/// Whether a session is played against the AI or another user.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    /// One human against the AI.
    OnePlayer,
    /// Two humans.
    TwoPlayers,
}

/// AI strength in one-player sessions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    /// Uniformly random moves.
    Easy,
    /// Mostly perfect play with occasional random moves.
    Medium,
    /// Perfect play.
    #[default]
    Hard,
}

/// One of the two seats at the board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Seat {
    /// Plays X.
    Player1,
    /// Plays O.
    Player2,
}

impl Seat {
    /// Mark played from this seat.
    pub fn mark(self) -> Mark {
        match self {
            Seat::Player1 => Mark::X,
            Seat::Player2 => Mark::O,
        }
    }
}
