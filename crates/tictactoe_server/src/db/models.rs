//! Row models and their mapping onto [`Session`].

use std::str::FromStr;

use chrono::NaiveDateTime;
use derive_getters::Getters;
use diesel::prelude::*;
use tictactoe_core::{Board, Difficulty, Mode, Session, SessionState, WinningLine};
use tracing::instrument;

use crate::db::{DbError, schema};

/// Session database model.
///
/// Enums are stored as their snake_case names, the board as its 9-character
/// compact form and the winning line as cell digits.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable, Getters)]
#[diesel(table_name = schema::sessions)]
pub struct SessionRow {
    id: String,
    creator_id: String,
    mode: String,
    difficulty: String,
    board: String,
    state: String,
    player1_id: Option<String>,
    player2_id: Option<String>,
    winning_cells: Option<String>,
    version: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl SessionRow {
    /// Builds a row for a freshly stored session.
    pub fn from_session(session: &Session, version: i32, now: NaiveDateTime) -> Self {
        Self {
            id: session.id().clone(),
            creator_id: session.creator_id().clone(),
            mode: session.mode().to_string(),
            difficulty: session.difficulty().to_string(),
            board: session.board().to_compact(),
            state: session.state().to_string(),
            player1_id: session.player1_id().clone(),
            player2_id: session.player2_id().clone(),
            winning_cells: session.winning_line().as_ref().map(|line| line.to_compact()),
            version,
            created_at: (*session.created_at()).unwrap_or(now),
            updated_at: now,
        }
    }

    /// Decodes the row back into a session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a stored column does not decode.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn into_session(self) -> Result<Session, DbError> {
        let mode = parse_column::<Mode>("mode", &self.mode)?;
        let difficulty = parse_column::<Difficulty>("difficulty", &self.difficulty)?;
        let state = parse_column::<SessionState>("state", &self.state)?;
        let board = Board::from_compact(&self.board)
            .map_err(|e| DbError::corrupt_column("board", &self.board, e))?;
        let winning_line = match self.winning_cells.as_deref() {
            Some(cells) => Some(
                WinningLine::from_compact(cells)
                    .map_err(|e| DbError::corrupt_column("winning_cells", cells, e))?,
            ),
            None => None,
        };

        Ok(
            Session::new(self.id, mode, difficulty, None, self.creator_id)
                .with_board(board)
                .with_state(state)
                .with_player1_id(self.player1_id)
                .with_player2_id(self.player2_id)
                .with_winning_line(winning_line)
                .with_version(self.version)
                .with_created_at(Some(self.created_at))
                .with_updated_at(Some(self.updated_at)),
        )
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    T::from_str(value).map_err(|e| DbError::corrupt_column(column, value, e))
}

/// Changeset written by an update. Id, creator and creation time never change.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::sessions)]
#[diesel(treat_none_as_null = true)]
pub struct SessionChanges {
    mode: String,
    difficulty: String,
    board: String,
    state: String,
    player1_id: Option<String>,
    player2_id: Option<String>,
    winning_cells: Option<String>,
    version: i32,
    updated_at: NaiveDateTime,
}

impl SessionChanges {
    /// Changes that move `session` to `version`.
    pub fn from_session(session: &Session, version: i32, now: NaiveDateTime) -> Self {
        Self {
            mode: session.mode().to_string(),
            difficulty: session.difficulty().to_string(),
            board: session.board().to_compact(),
            state: session.state().to_string(),
            player1_id: session.player1_id().clone(),
            player2_id: session.player2_id().clone(),
            winning_cells: session.winning_line().as_ref().map(|line| line.to_compact()),
            version,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::Seat;

    #[test]
    fn test_row_round_trip_keeps_every_column() {
        let now = chrono::Utc::now().naive_utc();
        let board = Board::from_compact("XXXOO----").unwrap();
        let session = Session::new(
            "abc".to_string(),
            Mode::TwoPlayers,
            Difficulty::Medium,
            Some(Seat::Player1),
            "alice".to_string(),
        )
        .with_player2_id(Some("bob".to_string()))
        .with_state(SessionState::Player1Winner)
        .with_winning_line(tictactoe_core::winning_line(&board))
        .with_board(board);

        let row = SessionRow::from_session(&session, 3, now);
        assert_eq!(row.state(), "player1_winner");
        assert_eq!(row.winning_cells().as_deref(), Some("012"));

        let decoded = row.into_session().unwrap();
        assert_eq!(decoded.board(), session.board());
        assert_eq!(*decoded.state(), SessionState::Player1Winner);
        assert_eq!(decoded.player2_id().as_deref(), Some("bob"));
        assert_eq!(*decoded.version(), 3);
        assert_eq!(*decoded.created_at(), Some(now));
    }

    #[test]
    fn test_corrupt_state_column_is_rejected() {
        let now = chrono::Utc::now().naive_utc();
        let session = Session::new(
            "abc".to_string(),
            Mode::OnePlayer,
            Difficulty::Easy,
            None,
            "alice".to_string(),
        );
        let mut row = SessionRow::from_session(&session, 1, now);
        row.state = "sideways".to_string();
        assert!(row.into_session().is_err());
    }
}
