//! Error types for the request server.

use arcade_core::CoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed or incomplete request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No registered session has this id.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The registry is full.
    #[error("too many sessions: limit is {limit}")]
    TooManySessions {
        /// Configured maximum.
        limit: usize,
    },

    /// `commit` or `rollback` with no open transaction.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// The store could not serve the request right now.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored value could not be converted to or from JSON.
    #[error("value codec error: {0}")]
    Codec(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(CoreError),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::UnknownSession(_)
                | ServerError::TooManySessions { .. }
                | ServerError::NoActiveTransaction
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) | ServerError::NoActiveTransaction => 400,
            ServerError::UnknownSession(_) => 404,
            ServerError::TooManySessions { .. } => 429,
            ServerError::StoreUnavailable(_) => 503,
            ServerError::Codec(_) | ServerError::Store(_) => 500,
        }
    }
}

fn is_unavailable(err: &CoreError) -> bool {
    match err {
        CoreError::StoreUnavailable { .. } | CoreError::StoreBusy { .. } => true,
        CoreError::BatchApplyFailed { source } => is_unavailable(source),
        _ => false,
    }
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        if matches!(err, CoreError::NoActiveTransaction) {
            ServerError::NoActiveTransaction
        } else if is_unavailable(&err) {
            ServerError::StoreUnavailable(err.to_string())
        } else {
            ServerError::Store(err)
        }
    }
}
