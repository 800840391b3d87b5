//! Exhaustive minimax search.
//!
//! The recursive core is deterministic: it returns the best score and the
//! full set of moves achieving it. Picking one of those moves at random is
//! left to the caller.

use crate::board::{Board, Cell, Mark, Point};
use crate::rules::{GameStatus, status};
use tracing::{debug, instrument};

/// Score of an immediate win before the depth penalty.
pub const MAX_SCORE: i32 = 10;

/// Outcome of a root search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Best achievable score for the searching mark.
    pub score: i32,
    /// Every root move achieving `score`, in row-major order.
    pub best_moves: Vec<Point>,
    /// Positions visited, root excluded.
    pub nodes: u64,
}

/// Minimax search over a single owned board buffer.
///
/// Moves are placed and retracted on the same buffer, so a search never
/// allocates a board per branch and leaves the buffer as it found it.
#[derive(Debug, Clone)]
pub struct Minimax {
    board: Board,
    ai: Mark,
    nodes: u64,
}

impl Minimax {
    /// Prepares a search for `ai` on a copy of `board`.
    pub fn new(board: &Board, ai: Mark) -> Self {
        Self {
            board: board.clone(),
            ai,
            nodes: 0,
        }
    }

    /// The search buffer.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Searches every reply for the AI's mark.
    ///
    /// Returns `None` if the game is already decided.
    #[instrument(skip(self), fields(board = %self.board.to_compact(), ai = %self.ai))]
    pub fn search(&mut self) -> Option<SearchResult> {
        if status(&self.board) != GameStatus::InProgress {
            return None;
        }

        self.nodes = 0;
        let mut scored = Vec::new();
        for point in Board::points() {
            if !self.board.get(point).is_empty() {
                continue;
            }
            self.board.set(point, Cell::Occupied(self.ai));
            let score = self.score(false, 1);
            self.board.set(point, Cell::Empty);
            scored.push((point, score));
        }

        let score = scored.iter().map(|(_, s)| *s).max()?;
        let best_moves: Vec<Point> = scored
            .into_iter()
            .filter(|(_, s)| *s == score)
            .map(|(p, _)| p)
            .collect();

        debug!(score, candidates = best_moves.len(), nodes = self.nodes, "Search complete");
        Some(SearchResult {
            score,
            best_moves,
            nodes: self.nodes,
        })
    }

    /// Scores the current buffer with `depth` plies already played.
    fn score(&mut self, maximizing: bool, depth: i32) -> i32 {
        self.nodes += 1;
        match status(&self.board) {
            GameStatus::Won(mark) if mark == self.ai => return MAX_SCORE - depth,
            GameStatus::Won(_) => return depth - MAX_SCORE,
            GameStatus::Draw => return 0,
            GameStatus::InProgress => {}
        }

        let mover = if maximizing { self.ai } else { self.ai.opponent() };
        let mut best = if maximizing { i32::MIN } else { i32::MAX };

        for point in Board::points() {
            if !self.board.get(point).is_empty() {
                continue;
            }
            self.board.set(point, Cell::Occupied(mover));
            let score = self.score(!maximizing, depth + 1);
            self.board.set(point, Cell::Empty);

            best = if maximizing {
                best.max(score)
            } else {
                best.min(score)
            };
        }

        best
    }
}
