//! Tic-tac-toe session service.
//!
//! Wraps the engine in `tictactoe_core` with persistence, push
//! notifications and configuration:
//!
//! - [`SessionService`] orchestrates every session operation
//! - [`SessionStore`] is the storage seam, with [`MemorySessionStore`] and
//!   [`SqliteSessionStore`] behind it
//! - [`SessionNotifier`] pushes updates, [`BroadcastHub`] over tokio channels

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod notify;
mod service;
mod store;

pub mod db;
pub mod play;

pub use config::{ConfigError, DATABASE_URL_VAR, DEFAULT_CONFIG_FILE, LOG_LEVEL_VAR, ServerConfig};
pub use db::{DbError, SqliteSessionStore};
pub use notify::{BroadcastHub, SessionNotifier, SessionUpdate, UpdateKind};
pub use service::SessionService;
pub use store::{MemorySessionStore, SessionStore, is_available_for, is_finished_for};
