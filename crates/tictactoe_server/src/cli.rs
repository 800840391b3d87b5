//! Command-line interface for the tic-tac-toe server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tictactoe_core::{Difficulty, Seat};

/// Tic-tac-toe - Session engine with a minimax opponent
#[derive(Parser, Debug)]
#[command(name = "tictactoe")]
#[command(about = "Tic-tac-toe sessions against people or the AI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./tictactoe.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path, overriding config and environment
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or upgrade the database schema
    Migrate,

    /// Play one game against the AI in the terminal
    Play {
        /// AI strength: easy, medium or hard
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Seat to take: player1 plays X and moves first
        #[arg(short, long, default_value = "player1")]
        seat: Seat,

        /// Name recorded as the player
        #[arg(short, long, default_value = "player")]
        user: String,
    },

    /// Let two AIs play each other and print the tally
    SelfPlay {
        /// Number of games
        #[arg(short, long, default_value = "10")]
        games: u32,

        /// Strength of X
        #[arg(long, default_value = "hard")]
        x: Difficulty,

        /// Strength of O
        #[arg(long, default_value = "hard")]
        o: Difficulty,

        /// Seed for reproducible games
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List a user's stored sessions as JSON
    Sessions {
        /// User whose sessions to list
        #[arg(short, long)]
        user: String,

        /// Only sessions the user could join instead
        #[arg(long)]
        available: bool,
    },

    /// Show a user's win ratio
    Stats {
        /// User to report on
        #[arg(short, long)]
        user: String,
    },
}
