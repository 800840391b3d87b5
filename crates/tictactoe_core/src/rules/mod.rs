//! Game rules for tic-tac-toe.
//!
//! Pure functions over a [`Board`](crate::Board): line detection and
//! outcome evaluation. Rules are separated from board storage so the
//! validator, the AI search and the session state machine share them.

mod line;
mod outcome;

pub use line::{LINES, WinningLine, winning_line};
pub use outcome::{GameStatus, evaluate, status};
