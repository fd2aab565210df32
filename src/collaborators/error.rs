//! Collaborator errors.

use thiserror::Error;

/// A backend, cache, outbound or authentication collaborator failed.
///
/// The text is for server-side logs only; clients see a generic status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no connection named `{0}`")]
    UnknownConnection(String),

    #[error("backend execution failed: {0}")]
    Execution(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("authentication provider failed: {0}")]
    Authentication(String),
}

/// Result type for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;
