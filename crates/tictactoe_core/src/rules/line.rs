//! Line detection and the winning-line codec.

use crate::board::{Board, Cell, Mark, Point};
use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Every line on the board, in the order they are checked.
///
/// Rows and columns interleave by index, then the main diagonal, then the
/// anti-diagonal. Outcome evaluation and winning-line reporting both walk
/// this table, so they always agree on which line is reported.
pub const LINES: [[Point; 3]; 8] = [
    [Point::new(0, 0), Point::new(0, 1), Point::new(0, 2)],
    [Point::new(0, 0), Point::new(1, 0), Point::new(2, 0)],
    [Point::new(1, 0), Point::new(1, 1), Point::new(1, 2)],
    [Point::new(0, 1), Point::new(1, 1), Point::new(2, 1)],
    [Point::new(2, 0), Point::new(2, 1), Point::new(2, 2)],
    [Point::new(0, 2), Point::new(1, 2), Point::new(2, 2)],
    [Point::new(0, 0), Point::new(1, 1), Point::new(2, 2)],
    [Point::new(2, 0), Point::new(1, 1), Point::new(0, 2)],
];

/// The three points of a completed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinningLine([Point; 3]);

impl WinningLine {
    /// Wraps three points.
    pub fn new(points: [Point; 3]) -> Self {
        Self(points)
    }

    /// Points of the line, in table order.
    pub fn points(&self) -> &[Point; 3] {
        &self.0
    }

    /// True if `point` is part of the line.
    pub fn contains(&self, point: Point) -> bool {
        self.0.contains(&point)
    }

    /// Encodes the line as digits, one `row * 3 + col` per point.
    pub fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|p| char::from(b'0' + p.index() as u8))
            .collect()
    }

    /// Decodes a digit string produced by [`WinningLine::to_compact`].
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error unless the input is exactly three
    /// digits in `0..=8`.
    #[instrument]
    pub fn from_compact(data: &str) -> Result<Self, SessionError> {
        let points = data
            .chars()
            .map(|c| {
                c.to_digit(10)
                    .and_then(|d| Point::from_index(d as usize))
                    .ok_or_else(|| {
                        SessionError::invalid_input(format!("Invalid winning cell '{}'", c))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let points: [Point; 3] = points.try_into().map_err(|v: Vec<Point>| {
            SessionError::invalid_input(format!(
                "Winning line needs 3 cells, got {}",
                v.len()
            ))
        })?;
        Ok(Self(points))
    }
}

/// Finds the first completed line and the mark that completed it.
pub(crate) fn completed_line(board: &Board) -> Option<(Mark, WinningLine)> {
    LINES.iter().find_map(|&[a, b, c]| match board.get(a) {
        Cell::Occupied(mark) if board.get(b) == board.get(a) && board.get(c) == board.get(a) => {
            Some((mark, WinningLine([a, b, c])))
        }
        _ => None,
    })
}

/// Returns the first completed line on the board, if any.
#[instrument(skip(board), fields(board = %board.to_compact()))]
pub fn winning_line(board: &Board) -> Option<WinningLine> {
    completed_line(board).map(|(_, line)| line)
}
