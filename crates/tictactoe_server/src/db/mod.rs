//! SQLite persistence for game sessions.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::DbError;
pub use models::{SessionChanges, SessionRow};
pub use repository::{MIGRATIONS, SqliteSessionStore};
