//! Terminal game against the AI.

use std::io::Write;

use anyhow::Result;
use tictactoe_core::{Cell, Difficulty, Mode, Point, Seat, Session, SessionState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument};

use crate::notify::SessionNotifier;
use crate::service::SessionService;
use crate::store::SessionStore;

/// Plays one one-player game, reading cell numbers (1-9) from `input`.
///
/// `q` or end of input abandons the game. Returns the session as last
/// stored.
///
/// # Errors
///
/// Fails if the store fails or `output` cannot be written. Rejected moves
/// are reported to `output` and the game goes on.
#[instrument(skip(service, input, output))]
pub async fn play_against_ai<S, N, R, W>(
    service: &SessionService<S, N>,
    user_id: &str,
    difficulty: Difficulty,
    seat: Seat,
    input: R,
    output: &mut W,
) -> Result<Session>
where
    S: SessionStore,
    N: SessionNotifier,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = service
        .create_session(Mode::OnePlayer, difficulty, Some(seat), user_id)
        .await?;
    writeln!(
        output,
        "You play {} against a {} AI.",
        seat.mark(),
        difficulty
    )?;

    if seat == Seat::Player2 {
        // Resubmitting the empty board lets the AI open.
        let board = session.board().clone();
        session = service.submit_move(user_id, session.id(), &board).await?;
    }

    let mut lines = input.lines();
    loop {
        writeln!(output, "\n{}\n", session.board())?;

        if session.state().is_terminal() {
            writeln!(output, "{}", outcome_message(&session, user_id))?;
            info!(state = %session.state(), "Game over");
            return Ok(session);
        }

        write!(output, "Your move ({}), 1-9 or q: ", seat.mark())?;
        output.flush()?;

        let Some(line) = lines.next_line().await? else {
            debug!("Input closed");
            return Ok(session);
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            writeln!(output, "Game abandoned.")?;
            return Ok(session);
        }

        let Some(point) = parse_cell(line) else {
            writeln!(output, "Enter a cell number from 1 to 9.")?;
            continue;
        };
        if !session.board().get(point).is_empty() {
            writeln!(output, "Cell {} is taken.", line)?;
            continue;
        }

        let mut board = session.board().clone();
        board.set(point, Cell::Occupied(seat.mark()));
        let result = service.submit_move(user_id, session.id(), &board).await;
        match result {
            Ok(next) => session = next,
            Err(e) => writeln!(output, "{}", e.kind)?,
        }
    }
}

/// Cell numbers run 1-9 left to right, top to bottom.
fn parse_cell(text: &str) -> Option<Point> {
    let number: usize = text.parse().ok()?;
    Point::from_index(number.checked_sub(1)?)
}

fn outcome_message(session: &Session, user_id: &str) -> String {
    let line = session
        .winning_line()
        .as_ref()
        .map(|line| format!(" (cells {})", line.to_compact()))
        .unwrap_or_default();

    match (session.state(), session.winner_id()) {
        (SessionState::Draw, _) => "Draw.".to_string(),
        (_, Some(winner)) if winner == user_id => format!("You win!{}", line),
        _ => format!("The AI wins.{}", line),
    }
}
