//! Storage failures and their mapping onto session errors.

use std::fmt::Display;

use derive_more::{Display, Error};
use tictactoe_core::SessionError;
use tracing::instrument;

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database error: {} at {}:{}", message, file, line)]
pub struct DbError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new database error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// The database at `path` could not be opened.
    #[track_caller]
    pub fn connect(path: &str, reason: impl Display) -> Self {
        Self::new(format!("Failed to connect to '{}': {}", path, reason))
    }

    /// A schema migration failed.
    #[track_caller]
    pub fn migration(reason: impl Display) -> Self {
        Self::new(format!("Migration failed: {}", reason))
    }

    /// A stored column holds a value the engine cannot read back.
    #[track_caller]
    pub fn corrupt_column(column: &str, value: &str, reason: impl Display) -> Self {
        Self::new(format!("Invalid {} column '{}': {}", column, value, reason))
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Query failed: {}", err))
    }
}

/// Storage failures reach callers as `Storage` session errors.
impl From<DbError> for SessionError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        SessionError::storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::SessionErrorKind;

    #[test]
    fn test_corrupt_column_names_the_column() {
        let err = DbError::corrupt_column("state", "sideways", "no such variant");
        assert!(err.message.contains("state"));
        assert!(err.message.contains("sideways"));
        assert!(err.file.ends_with("error.rs"));
    }

    #[test]
    fn test_converts_to_storage_kind() {
        let err: SessionError = DbError::migration("disk full").into();
        assert!(matches!(err.kind, SessionErrorKind::Storage(ref m) if m.contains("disk full")));
        assert!(!err.is_retryable());
    }
}
