//! Core type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequence number for ordering applied frames.
///
/// Every autocommit write and every outermost commit is applied to the table
/// as one frame and receives the next sequence number. Higher sequence
/// numbers indicate later applies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// How a flush reached the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKind {
    /// A `set` or `delete` issued with no open transaction.
    Autocommit,
    /// The outermost `commit` of a transaction stack.
    Transaction,
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Autocommit => f.write_str("autocommit"),
            Self::Transaction => f.write_str("transaction"),
        }
    }
}
