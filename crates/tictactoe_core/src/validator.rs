//! Move validation: checks a client-submitted board against the stored one.

use crate::board::{Board, Cell, Mark, Point};
use crate::error::{SessionError, SessionErrorKind};
use crate::session::Session;
use crate::state::{Mode, SessionState};
use tracing::{debug, instrument, warn};

/// Validates a submitted board and returns the session carrying it.
///
/// The stored session is `None` when the id did not resolve. Exactly zero
/// or one cell may differ from the stored board; zero differences is an
/// accepted re-submission. The turn is not advanced here.
///
/// # Errors
///
/// - `NotFound` if there is no stored session.
/// - `WaitingForPlayers` if a two-player session still has an open seat.
/// - `InvalidState` if the game is over.
/// - `Forbidden` if the acting user may not move now.
/// - `InvalidInput` if a filled cell was altered, more than one cell
///   changed, or the placed mark is not the mover's.
#[instrument(skip(stored, submitted), fields(board = %submitted.to_compact()))]
pub fn validate_move(
    stored: Option<Session>,
    submitted: &Board,
    user_id: &str,
) -> Result<Session, SessionError> {
    let mut session = stored.ok_or_else(|| SessionError::not_found("Session not found"))?;

    let state = *session.state();
    if state == SessionState::WaitingForPlayers {
        warn!(session_id = %session.id(), "Move attempted before all players joined");
        return Err(SessionError::new(SessionErrorKind::WaitingForPlayers(
            "Join second player first".to_string(),
        )));
    }
    if state.is_terminal() {
        warn!(session_id = %session.id(), %state, "Move attempted after game over");
        return Err(SessionError::invalid_state("Can't make move. Game is over"));
    }

    let mover = entitled_mark(&session, user_id)?;

    if let Some((point, placed)) = single_change(session.board(), submitted)? {
        let expected = state.mark_to_move();
        if Some(placed) != expected || Some(placed) != mover {
            warn!(%point, %placed, ?expected, "Wrong mark placed");
            return Err(SessionError::invalid_input(format!(
                "Mark {} may not be placed at {} now",
                placed, point
            )));
        }
        debug!(%point, %placed, "Move accepted");
    } else {
        debug!("Board unchanged");
    }

    session.replace_board(submitted.clone());
    Ok(session)
}

/// Checks that `user_id` may move now and returns the mark they may place.
///
/// In one-player mode the seated creator may always submit; the returned
/// mark is their seat's mark. In two-player mode only the seat whose turn it
/// is may move.
fn entitled_mark(session: &Session, user_id: &str) -> Result<Option<Mark>, SessionError> {
    let seat = session.seat_of(user_id);
    let allowed = match session.mode() {
        Mode::TwoPlayers => {
            seat.is_some() && seat.map(|s| s.mark()) == session.state().mark_to_move()
        }
        Mode::OnePlayer => session.is_creator(user_id) && seat.is_some(),
    };

    if !allowed {
        warn!(session_id = %session.id(), user_id, "User may not move in this session");
        return Err(SessionError::forbidden(
            "User is not allowed to modify this session",
        ));
    }
    Ok(seat.map(|s| s.mark()))
}

/// Finds the single cell that changed between `stored` and `submitted`.
fn single_change(stored: &Board, submitted: &Board) -> Result<Option<(Point, Mark)>, SessionError> {
    let mut change = None;

    for (point, old) in stored.iter() {
        let new = submitted.get(point);
        if old == new {
            continue;
        }
        if !old.is_empty() {
            return Err(SessionError::invalid_input(format!(
                "Cell value mismatch at {}",
                point
            )));
        }
        if change.is_some() {
            return Err(SessionError::invalid_input("Too many differences"));
        }
        if let Cell::Occupied(mark) = new {
            change = Some((point, mark));
        }
    }

    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Difficulty, Seat};

    fn board(text: &str) -> Board {
        Board::from_compact(text).unwrap()
    }

    fn two_player(state: SessionState, text: &str) -> Session {
        Session::new(
            "s".to_string(),
            Mode::TwoPlayers,
            Difficulty::Hard,
            Some(Seat::Player1),
            "alice".to_string(),
        )
        .with_player2_id(Some("bob".to_string()))
        .with_state(state)
        .with_board(board(text))
    }

    fn one_player(seat: Seat) -> Session {
        Session::new(
            "s".to_string(),
            Mode::OnePlayer,
            Difficulty::Easy,
            Some(seat),
            "alice".to_string(),
        )
    }

    fn kind(result: Result<Session, SessionError>) -> SessionErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_missing_session_is_not_found() {
        let err = kind(validate_move(None, &Board::new(), "alice"));
        assert!(matches!(err, SessionErrorKind::NotFound(_)));
    }

    #[test]
    fn test_accepts_single_placement() {
        let session = two_player(SessionState::Player1Turn, "---------");
        let next = validate_move(Some(session), &board("----X----"), "alice").unwrap();
        assert_eq!(next.board().to_compact(), "----X----");
        assert_eq!(*next.state(), SessionState::Player1Turn);
    }

    #[test]
    fn test_accepts_identical_board() {
        let session = two_player(SessionState::Player2Turn, "----X----");
        let next = validate_move(Some(session.clone()), &board("----X----"), "bob").unwrap();
        assert_eq!(next, session);
    }

    #[test]
    fn test_rejects_two_changes() {
        let session = two_player(SessionState::Player1Turn, "---------");
        let err = kind(validate_move(Some(session), &board("X---X----"), "alice"));
        assert!(matches!(err, SessionErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_blanking_a_cell() {
        let session = two_player(SessionState::Player1Turn, "----X---O");
        let err = kind(validate_move(Some(session), &board("----X----"), "alice"));
        assert!(matches!(err, SessionErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_overwriting_a_cell() {
        let session = two_player(SessionState::Player2Turn, "----X----");
        let err = kind(validate_move(Some(session), &board("----O----"), "bob"));
        assert!(matches!(err, SessionErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_wrong_mark() {
        let session = two_player(SessionState::Player1Turn, "---------");
        let err = kind(validate_move(Some(session), &board("O--------"), "alice"));
        assert!(matches!(err, SessionErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_out_of_turn_player() {
        let session = two_player(SessionState::Player1Turn, "---------");
        let err = kind(validate_move(Some(session), &board("X--------"), "bob"));
        assert!(matches!(err, SessionErrorKind::Forbidden(_)));
    }

    #[test]
    fn test_rejects_stranger() {
        let session = two_player(SessionState::Player1Turn, "---------");
        let err = kind(validate_move(Some(session), &board("X--------"), "mallory"));
        assert!(matches!(err, SessionErrorKind::Forbidden(_)));
    }

    #[test]
    fn test_waiting_is_reported_distinctly() {
        let session = two_player(SessionState::WaitingForPlayers, "---------");
        let err = kind(validate_move(Some(session), &board("X--------"), "alice"));
        assert!(matches!(err, SessionErrorKind::WaitingForPlayers(_)));
    }

    #[test]
    fn test_game_over_rejected() {
        let session = two_player(SessionState::Player1Winner, "XXXOO----");
        let err = kind(validate_move(Some(session), &board("XXXOO---O"), "bob"));
        assert!(matches!(err, SessionErrorKind::InvalidState(_)));
    }

    #[test]
    fn test_one_player_creator_moves() {
        let session = one_player(Seat::Player1);
        let next = validate_move(Some(session), &board("----X----"), "alice").unwrap();
        assert_eq!(next.board().to_compact(), "----X----");
    }

    #[test]
    fn test_one_player_second_seat_waits_for_ai_opening() {
        // Human plays O; on Player 1's turn only the unchanged board is accepted.
        let session = one_player(Seat::Player2);
        assert!(validate_move(Some(session.clone()), &Board::new(), "alice").is_ok());
        let err = kind(validate_move(Some(session), &board("X--------"), "alice"));
        assert!(matches!(err, SessionErrorKind::InvalidInput(_)));
    }

    #[test]
    fn test_one_player_other_user_forbidden() {
        let session = one_player(Seat::Player1);
        let err = kind(validate_move(Some(session), &board("----X----"), "bob"));
        assert!(matches!(err, SessionErrorKind::Forbidden(_)));
    }
}
