//! Tests for session orchestration over the in-memory store.

use tictactoe_core::{
    Board, Cell, Difficulty, Mark, Mode, Point, Seat, Session, SessionErrorKind, SessionState,
};
use tictactoe_server::{BroadcastHub, MemorySessionStore, SessionService, UpdateKind};

type Service = SessionService<MemorySessionStore, BroadcastHub>;

fn service() -> Service {
    SessionService::with_seed(MemorySessionStore::new(), BroadcastHub::default(), 7)
}

/// Board of `session` with `mark` added at cell `index` (row * 3 + col).
fn with_mark(session: &Session, mark: Mark, index: usize) -> Board {
    let mut board = session.board().clone();
    let point = Point::from_index(index).expect("Bad index");
    board.set(point, Cell::Occupied(mark));
    board
}

/// Two-player session with alice as X and bob as O, X to move.
async fn started_game(service: &Service) -> Session {
    let session = service
        .create_session(Mode::TwoPlayers, Difficulty::Hard, Some(Seat::Player1), "alice")
        .await
        .expect("Create failed");
    service
        .add_player_to_session(session.id(), "bob")
        .await
        .expect("Join failed")
}

async fn play(service: &Service, session: Session, user: &str, mark: Mark, index: usize) -> Session {
    let board = with_mark(&session, mark, index);
    service
        .submit_move(user, session.id(), &board)
        .await
        .expect("Move failed")
}

#[tokio::test]
async fn test_two_player_join_sequence() {
    let service = service();
    let session = service
        .create_session(Mode::TwoPlayers, Difficulty::Hard, None, "host")
        .await
        .expect("Create failed");
    assert_eq!(*session.state(), SessionState::WaitingForPlayers);

    let session = service
        .add_player_to_session(session.id(), "a")
        .await
        .expect("A failed to join");
    assert_eq!(*session.state(), SessionState::Player1Turn);
    assert_eq!(session.player1_id().as_deref(), Some("a"));

    let session = service
        .add_player_to_session(session.id(), "b")
        .await
        .expect("B failed to join");
    assert_eq!(*session.state(), SessionState::Player1Turn);
    assert_eq!(session.player2_id().as_deref(), Some("b"));

    let err = service
        .add_player_to_session(session.id(), "c")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::InvalidState(_)));
}

#[tokio::test]
async fn test_join_twice_and_join_one_player_fail() {
    let service = service();
    let session = service
        .create_session(Mode::TwoPlayers, Difficulty::Hard, Some(Seat::Player1), "alice")
        .await
        .expect("Create failed");
    let err = service
        .add_player_to_session(session.id(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::InvalidState(_)));

    let solo = service
        .create_session(Mode::OnePlayer, Difficulty::Easy, None, "alice")
        .await
        .expect("Create failed");
    let err = service
        .add_player_to_session(solo.id(), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::InvalidState(_)));

    let err = service
        .add_player_to_session("missing", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::NotFound(_)));
}

#[tokio::test]
async fn test_one_player_easy_center_move() {
    let service = service();
    let session = service
        .create_session(Mode::OnePlayer, Difficulty::Easy, Some(Seat::Player1), "alice")
        .await
        .expect("Create failed");

    let session = play(&service, session, "alice", Mark::X, 4).await;

    assert_eq!(session.board().get(Point::new(1, 1)), Cell::Occupied(Mark::X));
    assert_eq!(session.board().count(Mark::X), 1);
    assert_eq!(session.board().count(Mark::O), 1);
    assert_eq!(*session.state(), SessionState::Player1Turn);
    assert_eq!(*session.version(), 2);
}

#[tokio::test]
async fn test_ai_opens_for_second_seat() {
    let service = service();
    let session = service
        .create_session(Mode::OnePlayer, Difficulty::Hard, Some(Seat::Player2), "alice")
        .await
        .expect("Create failed");
    assert_eq!(*session.state(), SessionState::Player1Turn);

    let board = session.board().clone();
    let session = service
        .submit_move("alice", session.id(), &board)
        .await
        .expect("Opening failed");
    assert_eq!(session.board().count(Mark::X), 1);
    assert_eq!(session.board().count(Mark::O), 0);
    assert_eq!(*session.state(), SessionState::Player2Turn);
}

#[tokio::test]
async fn test_resubmitted_empty_board_leaves_first_seat_to_move() {
    let service = service();
    let mut session = service
        .create_session(Mode::OnePlayer, Difficulty::Hard, Some(Seat::Player1), "alice")
        .await
        .expect("Create failed");

    for _ in 0..4 {
        let board = session.board().clone();
        session = service
            .submit_move("alice", session.id(), &board)
            .await
            .expect("Resubmission failed");
        assert!(session.board().is_empty());
        assert_eq!(*session.state(), SessionState::Player1Turn);
    }
    assert!(session.winning_line().is_none());

    let session = play(&service, session, "alice", Mark::X, 4).await;
    assert_eq!(session.board().count(Mark::X), 1);
    assert_eq!(session.board().count(Mark::O), 1);
    assert_eq!(*session.state(), SessionState::Player1Turn);
}

#[tokio::test]
async fn test_two_player_game_to_win_and_reset() {
    let service = service();
    let session = started_game(&service).await;

    let session = play(&service, session, "alice", Mark::X, 0).await;
    assert_eq!(*session.state(), SessionState::Player2Turn);
    let session = play(&service, session, "bob", Mark::O, 3).await;
    let session = play(&service, session, "alice", Mark::X, 1).await;
    let session = play(&service, session, "bob", Mark::O, 4).await;
    let session = play(&service, session, "alice", Mark::X, 2).await;

    assert_eq!(*session.state(), SessionState::Player1Winner);
    assert_eq!(
        session.winning_line().as_ref().map(|l| l.to_compact()),
        Some("012".to_string())
    );

    let board = with_mark(&session, Mark::O, 8);
    let err = service
        .submit_move("bob", session.id(), &board)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::InvalidState(_)));

    let reset = service
        .reset_session(session.id(), "bob")
        .await
        .expect("Reset failed");
    assert!(reset.board().is_empty());
    assert_eq!(*reset.winning_line(), None);
    assert_eq!(*reset.state(), SessionState::Player1Turn);
    assert_eq!(*reset.mode(), Mode::TwoPlayers);
    assert_eq!(*reset.difficulty(), Difficulty::Hard);
    assert_eq!(reset.player1_id().as_deref(), Some("alice"));
    assert_eq!(reset.player2_id().as_deref(), Some("bob"));

    let ratio = service.win_ratio("alice", "Alice").await.expect("Ratio failed");
    assert_eq!(*ratio.ratio(), 0.0);
}

#[tokio::test]
async fn test_win_ratio_counts_finished_games() {
    let service = service();
    let session = started_game(&service).await;
    let session = play(&service, session, "alice", Mark::X, 0).await;
    let session = play(&service, session, "bob", Mark::O, 3).await;
    let session = play(&service, session, "alice", Mark::X, 1).await;
    let session = play(&service, session, "bob", Mark::O, 4).await;
    play(&service, session, "alice", Mark::X, 2).await;

    let alice = service.win_ratio("alice", "Alice").await.expect("Ratio failed");
    assert_eq!(*alice.ratio(), 1.0);
    assert_eq!(alice.login(), "Alice");
    let bob = service.win_ratio("bob", "Bob").await.expect("Ratio failed");
    assert_eq!(*bob.ratio(), 0.0);
    assert_eq!(
        service.get_finished_sessions("bob").await.expect("Query failed").len(),
        1
    );
}

#[tokio::test]
async fn test_moves_before_second_player_are_rejected() {
    let service = service();
    let session = service
        .create_session(Mode::TwoPlayers, Difficulty::Hard, Some(Seat::Player1), "alice")
        .await
        .expect("Create failed");
    let board = with_mark(&session, Mark::X, 4);
    let err = service
        .submit_move("alice", session.id(), &board)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::WaitingForPlayers(_)));
}

#[tokio::test]
async fn test_make_move_while_waiting_is_a_no_op() {
    let service = service();
    let session = service
        .create_session(Mode::TwoPlayers, Difficulty::Hard, None, "alice")
        .await
        .expect("Create failed");
    let unchanged = service.make_move(session.clone()).await.expect("No-op failed");
    assert_eq!(unchanged, session);
}

#[tokio::test]
async fn test_racing_moves_conflict() {
    let service = service();
    let session = started_game(&service).await;
    let board = with_mark(&session, Mark::X, 4);

    let first = service
        .validate_move("alice", session.id(), &board)
        .await
        .expect("Validation failed");
    let second = service
        .validate_move("alice", session.id(), &board)
        .await
        .expect("Validation failed");

    service.make_move(first).await.expect("First move failed");
    let err = service.make_move(second).await.unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::Conflict(_)));
    assert!(err.is_retryable());

    let stored = service
        .get_session(session.id())
        .await
        .expect("Query failed")
        .expect("Missing");
    assert_eq!(*stored.state(), SessionState::Player2Turn);
}

#[tokio::test]
async fn test_two_player_updates_are_broadcast() {
    let service = service();
    let session = service
        .create_session(Mode::TwoPlayers, Difficulty::Hard, Some(Seat::Player1), "alice")
        .await
        .expect("Create failed");
    let mut updates = service.notifier().subscribe(session.id());

    let session = service
        .add_player_to_session(session.id(), "bob")
        .await
        .expect("Join failed");
    let session = play(&service, session, "alice", Mark::X, 4).await;
    service
        .reset_session(session.id(), "alice")
        .await
        .expect("Reset failed");

    let joined = updates.recv().await.expect("No join update");
    assert_eq!(joined.kind, UpdateKind::PlayerJoined);
    assert_eq!(joined.session.player2_id().as_deref(), Some("bob"));

    let moved = updates.recv().await.expect("No move update");
    assert_eq!(moved.kind, UpdateKind::MoveMade);
    assert_eq!(*moved.session.state(), SessionState::Player2Turn);

    let reset = updates.recv().await.expect("No reset update");
    assert_eq!(reset.kind, UpdateKind::Reset);
    assert!(reset.session.board().is_empty());
}

#[tokio::test]
async fn test_one_player_moves_are_not_broadcast() {
    let service = service();
    let session = service
        .create_session(Mode::OnePlayer, Difficulty::Easy, None, "alice")
        .await
        .expect("Create failed");
    let mut updates = service.notifier().subscribe(session.id());

    let session = play(&service, session, "alice", Mark::X, 0).await;
    service
        .reset_session(session.id(), "alice")
        .await
        .expect("Reset failed");

    assert!(updates.try_recv().is_err());
}

#[tokio::test]
async fn test_mode_change_persists_only_when_changed() {
    let service = service();
    let session = service
        .create_session(Mode::OnePlayer, Difficulty::Medium, None, "alice")
        .await
        .expect("Create failed");

    let same = service
        .update_session_mode(session.id(), "alice", Mode::OnePlayer)
        .await
        .expect("No-op failed");
    assert_eq!(*same.version(), 1);

    let err = service
        .update_session_mode(session.id(), "bob", Mode::TwoPlayers)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::Forbidden(_)));

    let open = service
        .update_session_mode(session.id(), "alice", Mode::TwoPlayers)
        .await
        .expect("Switch failed");
    assert_eq!(*open.state(), SessionState::WaitingForPlayers);
    assert_eq!(*open.version(), 2);

    let listed = service
        .get_available_sessions("bob")
        .await
        .expect("Query failed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), open.id());
}

#[tokio::test]
async fn test_only_creator_deletes() {
    let service = service();
    let session = started_game(&service).await;

    let err = service
        .delete_session(session.id(), "bob")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::Forbidden(_)));

    let mut updates = service.notifier().subscribe(session.id());
    service
        .delete_session(session.id(), "alice")
        .await
        .expect("Delete failed");
    assert!(service.get_session(session.id()).await.expect("Query failed").is_none());
    assert!(updates.recv().await.is_err());
    assert_eq!(service.notifier().receiver_count(session.id()), 0);

    let err = service
        .delete_session(session.id(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SessionErrorKind::NotFound(_)));
}

#[tokio::test]
async fn test_user_sessions_lists_both_seats() {
    let service = service();
    started_game(&service).await;
    service
        .create_session(Mode::OnePlayer, Difficulty::Easy, None, "bob")
        .await
        .expect("Create failed");

    assert_eq!(service.get_user_sessions("bob").await.expect("Query failed").len(), 2);
    assert_eq!(service.get_user_sessions("alice").await.expect("Query failed").len(), 1);
    assert!(service.get_user_sessions("carol").await.expect("Query failed").is_empty());
}
