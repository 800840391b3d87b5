//! Outcome evaluation.

use super::line::completed_line;
use crate::board::{Board, Mark};
use crate::state::SessionState;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Outcome of a board, independent of whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// No line completed and at least one empty cell.
    InProgress,
    /// A mark completed a line.
    Won(Mark),
    /// Board is full and no line completed.
    Draw,
}

/// Classifies a board.
pub fn status(board: &Board) -> GameStatus {
    if let Some((mark, _)) = completed_line(board) {
        GameStatus::Won(mark)
    } else if board.is_full() {
        GameStatus::Draw
    } else {
        GameStatus::InProgress
    }
}

/// Evaluates a board against the current turn state.
///
/// Returns the winner state if a line is complete, `Draw` on a full board,
/// and `current` unchanged while the game continues.
#[instrument(skip(board), fields(board = %board.to_compact()))]
pub fn evaluate(board: &Board, current: SessionState) -> SessionState {
    match status(board) {
        GameStatus::Won(mark) => SessionState::winner(mark),
        GameStatus::Draw => SessionState::Draw,
        GameStatus::InProgress => current,
    }
}
