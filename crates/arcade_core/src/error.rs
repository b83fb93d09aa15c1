//! Error types for the arcade core.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// `commit` or `rollback` was called with no open transaction layer.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// The backing store could not serve the request.
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        /// Why the store could not be reached.
        reason: String,
    },

    /// The writer lock was not acquired within the configured busy timeout.
    #[error("store busy: writer lock not acquired within {waited:?}")]
    StoreBusy {
        /// How long the caller waited.
        waited: Duration,
    },

    /// An atomic batch was rejected; none of its mutations were applied.
    #[error("batch apply failed: {source}")]
    BatchApplyFailed {
        /// The underlying failure.
        #[source]
        source: Box<CoreError>,
    },

    /// A commit log record could not be appended after a successful flush.
    #[error("commit log append failed: {message}")]
    LogAppendFailed {
        /// Description of the failure.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] arcade_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The table file is corrupted or invalid.
    #[error("table corruption: {message}")]
    TableCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// The store directory is locked by another process.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// Invalid store layout or options.
    #[error("invalid store format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// An argument was rejected before touching the store.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a store unavailable error.
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Wraps a failure of an atomic batch.
    pub fn batch_apply_failed(source: CoreError) -> Self {
        Self::BatchApplyFailed {
            source: Box::new(source),
        }
    }

    /// Creates a commit log append error.
    pub fn log_append_failed(message: impl Into<String>) -> Self {
        Self::LogAppendFailed {
            message: message.into(),
        }
    }

    /// Creates a table corruption error.
    pub fn table_corruption(message: impl Into<String>) -> Self {
        Self::TableCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true if the backing store rejected or could not serve the call.
    ///
    /// The session layer stack is never in a half-applied state when this
    /// returns true; the store itself is unchanged.
    #[must_use]
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::StoreBusy { .. }
                | Self::BatchApplyFailed { .. }
                | Self::Storage(_)
                | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_failure_keeps_source() {
        let err = CoreError::batch_apply_failed(CoreError::StoreBusy {
            waited: Duration::from_millis(5),
        });
        assert!(err.is_store_failure());
        assert!(err.to_string().contains("store busy"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn log_failure_is_not_a_store_failure() {
        let err = CoreError::log_append_failed("disk full");
        assert!(!err.is_store_failure());
        assert!(!CoreError::NoActiveTransaction.is_store_failure());
    }
}
