//! Tic-tac-toe - Unified CLI
//!
//! Schema management, terminal play against the AI, AI self-play and
//! session queries.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tictactoe_core::{Difficulty, GameStatus, Mark, Seat, ai};
use tictactoe_server::{BroadcastHub, ServerConfig, SessionService, SqliteSessionStore, play};
use tokio::io::BufReader;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config = config.with_database_url(url);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Migrate => run_migrate(&config),
        Command::Play {
            difficulty,
            seat,
            user,
        } => {
            let difficulty = difficulty.unwrap_or(*config.default_difficulty());
            run_play(&config, &user, difficulty, seat).await
        }
        Command::SelfPlay { games, x, o, seed } => run_self_play(games, x, o, seed),
        Command::Sessions { user, available } => run_sessions(&config, &user, available).await,
        Command::Stats { user } => run_stats(&config, &user).await,
    }
}

/// Opens the configured database and brings its schema up to date.
#[instrument(skip(config), fields(database_url = %config.database_url()))]
fn open_store(config: &ServerConfig) -> Result<SqliteSessionStore> {
    let store = SqliteSessionStore::new(config.database_url().clone())?;
    store.run_migrations()?;
    Ok(store)
}

fn open_service(config: &ServerConfig) -> Result<SessionService<SqliteSessionStore, BroadcastHub>> {
    Ok(SessionService::new(open_store(config)?, BroadcastHub::default()))
}

/// Create or upgrade the database schema
fn run_migrate(config: &ServerConfig) -> Result<()> {
    let store = SqliteSessionStore::new(config.database_url().clone())?;
    let applied = store.run_migrations()?;
    println!("{} migration(s) applied to {}", applied, store.db_path());
    Ok(())
}

/// Play one game against the AI on stdin/stdout
async fn run_play(config: &ServerConfig, user: &str, difficulty: Difficulty, seat: Seat) -> Result<()> {
    let service = open_service(config)?;
    let input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();

    let session = play::play_against_ai(&service, user, difficulty, seat, input, &mut output).await?;
    info!(session_id = %session.id(), state = %session.state(), "Game stored");

    let ratio = service.win_ratio(user, user).await?;
    println!("Win ratio for {}: {:.2}", ratio.login(), ratio.ratio());
    Ok(())
}

/// Let two AIs play each other
#[instrument]
fn run_self_play(games: u32, x: Difficulty, o: Difficulty, seed: Option<u64>) -> Result<()> {
    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let (mut x_wins, mut o_wins, mut draws) = (0u32, 0u32, 0u32);

    for game in 1..=games {
        let result = ai::self_play(x, o, &mut rng);
        match result.status {
            GameStatus::Won(Mark::X) => x_wins += 1,
            GameStatus::Won(Mark::O) => o_wins += 1,
            GameStatus::Draw | GameStatus::InProgress => draws += 1,
        }
        info!(game, status = ?result.status, board = %result.board.to_compact(), "Game finished");
    }

    println!("X ({}) wins: {}", x, x_wins);
    println!("O ({}) wins: {}", o, o_wins);
    println!("Draws: {}", draws);
    Ok(())
}

/// Print a user's sessions as JSON
async fn run_sessions(config: &ServerConfig, user: &str, available: bool) -> Result<()> {
    let service = open_service(config)?;
    let sessions = if available {
        service.get_available_sessions(user).await?
    } else {
        service.get_user_sessions(user).await?
    };
    println!("{}", serde_json::to_string_pretty(&sessions)?);
    Ok(())
}

/// Print a user's win ratio
async fn run_stats(config: &ServerConfig, user: &str) -> Result<()> {
    let service = open_service(config)?;
    let ratio = service.win_ratio(user, user).await?;
    let finished = service.get_finished_sessions(user).await?;
    println!(
        "{}: {} finished game(s), win ratio {:.2}",
        ratio.login(),
        finished.len(),
        ratio.ratio()
    );
    Ok(())
}
