//! AI opponent.
//!
//! Three policies, selected by [`Difficulty`]:
//!
//! - **Easy** picks uniformly among empty cells.
//! - **Medium** plays like Easy with probability
//!   [`RANDOM_MOVE_PROBABILITY`] and like Hard otherwise.
//! - **Hard** runs a full [`Minimax`] search and picks uniformly among all
//!   optimal replies, so equally good games vary from one session to the next.
//!
//! The random source is always passed in.

mod minimax;

pub use minimax::{MAX_SCORE, Minimax, SearchResult};

use crate::board::{Board, Cell, Mark, Point};
use crate::rules::{GameStatus, status};
use crate::state::Difficulty;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

/// Chance that a Medium AI plays a random move instead of searching.
pub const RANDOM_MOVE_PROBABILITY: f64 = 0.30;

/// Chooses the AI's next move for `mark`, or `None` if no cell is empty.
#[instrument(skip(board, rng), fields(board = %board.to_compact()))]
pub fn choose_move<R: Rng + ?Sized>(
    board: &Board,
    mark: Mark,
    difficulty: Difficulty,
    rng: &mut R,
) -> Option<Point> {
    match difficulty {
        Difficulty::Easy => random_move(board, rng),
        Difficulty::Medium => {
            if rng.gen_bool(RANDOM_MOVE_PROBABILITY) {
                debug!("Medium AI playing randomly");
                random_move(board, rng)
            } else {
                best_move(board, mark, rng)
            }
        }
        Difficulty::Hard => best_move(board, mark, rng),
    }
}

/// Uniformly random empty cell.
pub fn random_move<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<Point> {
    board.empty_points().choose(rng).copied()
}

/// A uniformly random choice among all optimal moves for `mark`.
pub fn best_move<R: Rng + ?Sized>(board: &Board, mark: Mark, rng: &mut R) -> Option<Point> {
    let result = Minimax::new(board, mark).search()?;
    result.best_moves.choose(rng).copied()
}

/// A finished AI-versus-AI game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfPlayGame {
    /// Final board.
    pub board: Board,
    /// How the game ended.
    pub status: GameStatus,
    /// Moves in the order they were played, X first.
    pub moves: Vec<Point>,
}

/// Plays one game from an empty board, X with `x` and O with `o`.
#[instrument(skip(rng))]
pub fn self_play<R: Rng + ?Sized>(x: Difficulty, o: Difficulty, rng: &mut R) -> SelfPlayGame {
    let mut board = Board::new();
    let mut moves = Vec::with_capacity(Board::CELLS);
    let mut mark = Mark::X;

    while status(&board) == GameStatus::InProgress {
        let difficulty = match mark {
            Mark::X => x,
            Mark::O => o,
        };
        let Some(point) = choose_move(&board, mark, difficulty, rng) else {
            break;
        };
        board.set(point, Cell::Occupied(mark));
        moves.push(point);
        mark = mark.opponent();
    }

    let outcome = status(&board);
    debug!(?outcome, moves = moves.len(), "Self-play finished");
    SelfPlayGame {
        board,
        status: outcome,
        moves,
    }
}
