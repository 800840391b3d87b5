//! Tic-tac-toe session engine.
//!
//! Owns everything with real game content: the board, outcome evaluation,
//! move validation, the AI opponent and the session state machine. Storage,
//! identity and transport are the caller's business; every operation here
//! takes the session as loaded and hands back the session to persist.
//!
//! # Architecture
//!
//! - **Board**: fixed 3x3 grid with a 9-character compact encoding
//! - **Rules**: outcome evaluation and winning-line detection
//! - **Validator**: checks a client-submitted board against stored state
//! - **AI**: random, mixed and minimax policies
//! - **Session**: seats, turns, mode changes and resets
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use tictactoe_core::{Board, Difficulty, Mode, Seat, Session, SessionState, validate_move};
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1);
//! let session = Session::new(
//!     "game-1".to_string(),
//!     Mode::OnePlayer,
//!     Difficulty::Easy,
//!     Some(Seat::Player1),
//!     "alice".to_string(),
//! );
//!
//! let submitted = Board::from_compact("----X----").unwrap();
//! let mut session = validate_move(Some(session), &submitted, "alice").unwrap();
//! session.advance(&mut rng).unwrap();
//!
//! assert_eq!(*session.state(), SessionState::Player1Turn);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod error;
mod session;
mod state;
mod stats;
mod validator;

pub mod ai;
pub mod rules;

pub use board::{Board, Cell, Mark, Point};
pub use error::{SessionError, SessionErrorKind};
pub use rules::{GameStatus, WinningLine, evaluate, winning_line};
pub use session::{Session, SessionId, UserId, new_session_id};
pub use state::{Difficulty, Mode, Seat, SessionState};
pub use stats::WinRatio;
pub use validator::validate_move;
