//! One nesting level of buffered changes.

use crate::batch::WriteBatch;

/// How a layer resolves a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// The layer wrote this value.
    Written(&'a [u8]),
    /// The layer deleted the key.
    Deleted,
    /// The layer does not mention the key.
    Untouched,
}

/// Uncommitted writes and deletes of one transaction level.
///
/// A key is never both written and deleted in the same layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionLayer {
    changes: WriteBatch,
}

impl TransactionLayer {
    /// Creates an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a write, clearing any staged delete of the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.changes.put(key, value);
    }

    /// Stages a delete, clearing any staged write of the key.
    pub fn delete(&mut self, key: impl Into<String>) {
        self.changes.delete(key);
    }

    /// Resolves `key` against this layer only.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Lookup<'_> {
        if self.changes.deletes().contains(key) {
            Lookup::Deleted
        } else if let Some(value) = self.changes.writes().get(key) {
            Lookup::Written(value)
        } else {
            Lookup::Untouched
        }
    }

    /// Folds this layer into its parent.
    ///
    /// Deletes go first, then writes. Each clears the opposite entry in the
    /// parent, so the parent ends up with this layer's net effect on top of
    /// its own.
    pub fn merge_into(self, parent: &mut TransactionLayer) {
        let (writes, deletes) = self.changes.into_parts();
        for key in deletes {
            parent.delete(key);
        }
        for (key, value) in writes {
            parent.set(key, value);
        }
    }

    /// Returns the staged changes.
    #[must_use]
    pub fn changes(&self) -> &WriteBatch {
        &self.changes
    }

    /// Turns the layer into the batch the table applies.
    #[must_use]
    pub fn into_batch(self) -> WriteBatch {
        self.changes
    }

    /// Rebuilds a layer from a batch that could not be applied.
    #[must_use]
    pub fn from_batch(changes: WriteBatch) -> Self {
        Self { changes }
    }
}
