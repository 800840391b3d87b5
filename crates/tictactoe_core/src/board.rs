//! Board, cells and coordinates.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use tracing::instrument;

/// A player's mark.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
pub enum Mark {
    /// Player 1's mark (moves first).
    X,
    /// Player 2's mark.
    O,
}

impl Mark {
    /// Returns the opponent's mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Character used in the compact board encoding.
    pub fn symbol(self) -> char {
        match self {
            Mark::X => 'X',
            Mark::O => 'O',
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody has played here.
    #[default]
    Empty,
    /// Cell holds a mark.
    Occupied(Mark),
}

impl Cell {
    /// Character used for an empty cell in the compact encoding.
    pub const EMPTY_SYMBOL: char = '-';

    /// Encodes the cell as a single character.
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => Self::EMPTY_SYMBOL,
            Cell::Occupied(mark) => mark.symbol(),
        }
    }

    /// Decodes a character. Anything unrecognised is an empty cell.
    pub fn from_symbol(c: char) -> Self {
        match c {
            'X' => Cell::Occupied(Mark::X),
            'O' => Cell::Occupied(Mark::O),
            _ => Cell::Empty,
        }
    }

    /// Returns the mark in this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(mark) => Some(mark),
        }
    }

    /// True if the cell is empty.
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// A (row, column) coordinate on the board.
///
/// Both components are in `0..Board::SIZE`. Constructing a point outside
/// that range and indexing a board with it panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    /// Row, top to bottom.
    pub row: usize,
    /// Column, left to right.
    pub col: usize,
}

impl Point {
    /// Creates a point.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Creates a point from a row-major index (0-8).
    pub fn from_index(index: usize) -> Option<Self> {
        (index < Board::CELLS).then(|| Self::new(index / Board::SIZE, index % Board::SIZE))
    }

    /// Row-major index of this point (0-8).
    pub fn index(self) -> usize {
        self.row * Board::SIZE + self.col
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

const SIDE: usize = 3;

/// 3x3 tic-tac-toe board.
///
/// Dimensions are fixed; only cell values change. Serializes as the
/// 9-character compact string (row-major, `X`, `O` or `-` per cell).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Board {
    cells: [[Cell; SIDE]; SIDE],
}

impl Board {
    /// Side length.
    pub const SIZE: usize = SIDE;
    /// Number of cells.
    pub const CELLS: usize = Self::SIZE * Self::SIZE;

    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell at `point`.
    pub fn get(&self, point: Point) -> Cell {
        self.cells[point.row][point.col]
    }

    /// Sets the cell at `point`.
    pub fn set(&mut self, point: Point, cell: Cell) {
        self.cells[point.row][point.col] = cell;
    }

    /// Resets every cell to empty.
    pub fn clear(&mut self) {
        self.cells = [[Cell::Empty; Self::SIZE]; Self::SIZE];
    }

    /// All points in row-major order.
    pub fn points() -> impl Iterator<Item = Point> {
        (0..Self::CELLS).map(|i| Point::new(i / Self::SIZE, i % Self::SIZE))
    }

    /// Iterates `(point, cell)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Point, Cell)> + '_ {
        Self::points().map(move |p| (p, self.get(p)))
    }

    /// Empty points in row-major order.
    pub fn empty_points(&self) -> Vec<Point> {
        self.iter()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(p, _)| p)
            .collect()
    }

    /// True if no cell is empty.
    pub fn is_full(&self) -> bool {
        self.iter().all(|(_, cell)| !cell.is_empty())
    }

    /// True if every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, cell)| cell.is_empty())
    }

    /// Number of cells holding `mark`.
    pub fn count(&self, mark: Mark) -> usize {
        self.iter()
            .filter(|(_, cell)| *cell == Cell::Occupied(mark))
            .count()
    }

    /// Mark whose turn the cell counts imply. X moves first, so X is next
    /// unless X is ahead.
    pub fn next_mark(&self) -> Mark {
        if self.count(Mark::X) > self.count(Mark::O) {
            Mark::O
        } else {
            Mark::X
        }
    }

    /// Encodes the board as its 9-character compact form.
    pub fn to_compact(&self) -> String {
        self.iter().map(|(_, cell)| cell.symbol()).collect()
    }

    /// Decodes a 9-character compact board.
    ///
    /// Unknown characters decode to empty cells.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidInput` error if the string is not 9 characters long.
    #[instrument]
    pub fn from_compact(data: &str) -> Result<Self, SessionError> {
        let count = data.chars().count();
        if count != Self::CELLS {
            return Err(SessionError::invalid_input(format!(
                "Compact board must have {} cells, got {}",
                Self::CELLS,
                count
            )));
        }

        let mut board = Self::new();
        for (point, c) in Self::points().zip(data.chars()) {
            board.set(point, Cell::from_symbol(c));
        }
        Ok(board)
    }
}

impl Index<Point> for Board {
    type Output = Cell;

    fn index(&self, point: Point) -> &Cell {
        &self.cells[point.row][point.col]
    }
}

impl IndexMut<Point> for Board {
    fn index_mut(&mut self, point: Point) -> &mut Cell {
        &mut self.cells[point.row][point.col]
    }
}

impl TryFrom<String> for Board {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_compact(&value)
    }
}

impl From<Board> for String {
    fn from(board: Board) -> Self {
        board.to_compact()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..Self::SIZE {
            for col in 0..Self::SIZE {
                let point = Point::new(row, col);
                match self.get(point) {
                    Cell::Empty => write!(f, "{}", point.index() + 1)?,
                    Cell::Occupied(mark) => write!(f, "{}", mark)?,
                }
                if col < Self::SIZE - 1 {
                    write!(f, "|")?;
                }
            }
            if row < Self::SIZE - 1 {
                write!(f, "\n-+-+-\n")?;
            }
        }
        Ok(())
    }
}
