//! Session error types.

use derive_more::{Display, Error};
use tracing::instrument;

/// What went wrong with a session operation.
///
/// Callers map each kind to their own status codes; the engine only
/// signals which rule was broken.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SessionErrorKind {
    /// Session (or another referenced entity) does not exist.
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Acting user is not entitled to perform the operation.
    #[display("Forbidden: {}", _0)]
    Forbidden(String),
    /// A two-player session still has an open seat, so nobody may move.
    #[display("Waiting for players: {}", _0)]
    WaitingForPlayers(String),
    /// Operation is not valid in the session's current state.
    #[display("Invalid state: {}", _0)]
    InvalidState(String),
    /// Submitted data is malformed or breaks a board rule.
    #[display("Invalid input: {}", _0)]
    InvalidInput(String),
    /// Stored session changed underneath the caller. Safe to retry.
    #[display("Conflict: {}", _0)]
    Conflict(String),
    /// Storage or notification collaborator failed.
    #[display("Storage failure: {}", _0)]
    Storage(String),
}

/// Session error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Session error: {} at {}:{}", kind, file, line)]
pub struct SessionError {
    /// Error kind.
    pub kind: SessionErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SessionError {
    /// Creates a new session error with caller location tracking.
    #[track_caller]
    #[instrument(skip(kind))]
    pub fn new(kind: SessionErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Shorthand for [`SessionErrorKind::NotFound`].
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::NotFound(message.into()))
    }

    /// Shorthand for [`SessionErrorKind::Forbidden`].
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Forbidden(message.into()))
    }

    /// Shorthand for [`SessionErrorKind::InvalidState`].
    #[track_caller]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InvalidState(message.into()))
    }

    /// Shorthand for [`SessionErrorKind::InvalidInput`].
    #[track_caller]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InvalidInput(message.into()))
    }

    /// Shorthand for [`SessionErrorKind::Conflict`].
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Conflict(message.into()))
    }

    /// Shorthand for [`SessionErrorKind::Storage`].
    #[track_caller]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Storage(message.into()))
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &SessionErrorKind {
        &self.kind
    }

    /// True if the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, SessionErrorKind::Conflict(_))
    }
}
