//! Sessions and their stacks of nested transaction layers.
//!
//! A [`Session`] starts in autocommit mode (depth 0): every `set` and
//! `delete` is applied to the table at once and recorded in the commit log.
//! `begin` pushes a [`TransactionLayer`]; while any layer is open, writes are
//! staged on the top layer and are visible only to this session.
//!
//! Committing an inner layer merges it into its parent without touching the
//! table. Committing the outermost layer applies its net effect as one
//! atomic batch. If that batch is rejected, the layer is pushed back so the
//! caller can retry or roll it back; no log record is written.
//!
//! ```rust
//! use arcade_core::Store;
//!
//! let store = Store::open_in_memory().unwrap();
//! let mut session = store.new_session();
//!
//! session.begin();
//! session.set("a", b"1".to_vec()).unwrap();
//! session.begin();
//! session.set("a", b"2".to_vec()).unwrap();
//! assert_eq!(session.get("a").unwrap(), Some(b"2".to_vec()));
//!
//! session.commit().unwrap();
//! session.rollback().unwrap();
//! assert_eq!(store.get("a").unwrap(), None);
//! ```

mod layer;

pub use layer::{Lookup, TransactionLayer};

use crate::batch::WriteBatch;
use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::types::{CommitKind, SequenceNumber};

/// Outcome of a flush to the table.
#[derive(Debug)]
pub struct FlushReport {
    /// Table sequence number assigned to the flush.
    pub sequence: SequenceNumber,
    /// Set if the commit log append failed. The flush itself stands.
    pub log_error: Option<CoreError>,
}

/// What a session operation did.
#[derive(Debug)]
pub enum Applied {
    /// The change was staged on the top layer.
    Staged,
    /// An inner layer was merged into its parent.
    Merged,
    /// The top layer was discarded.
    RolledBack,
    /// Changes reached the table.
    Flushed(FlushReport),
}

impl Applied {
    /// Returns the flush report if the operation reached the table.
    #[must_use]
    pub fn flush_report(&self) -> Option<&FlushReport> {
        match self {
            Self::Flushed(report) => Some(report),
            _ => None,
        }
    }
}

/// A client's private view of the store.
///
/// A session borrows its store and cannot outlive it. It is not meant to be
/// driven by two callers at once; `&mut self` on every mutating operation
/// makes callers serialize their own use.
#[derive(Debug)]
pub struct Session<'a> {
    store: &'a Store,
    stack: Vec<TransactionLayer>,
    origin: Option<String>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            store,
            stack: Vec::new(),
            origin: None,
        }
    }

    /// Sets the label recorded as the origin of this session's flushes.
    ///
    /// Without a label the name of the flushing thread is used.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns the origin label used for the next flush.
    #[must_use]
    pub fn origin(&self) -> String {
        self.origin.clone().unwrap_or_else(|| {
            let current = std::thread::current();
            current
                .name()
                .map_or_else(|| format!("{:?}", current.id()), str::to_owned)
        })
    }

    /// Returns the number of open transaction layers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Opens a new, empty transaction layer.
    pub fn begin(&mut self) {
        self.stack.push(TransactionLayer::new());
        self.store.stats().record_begin();
        tracing::debug!(depth = self.depth(), "begin");
    }

    /// Writes `value` under `key`.
    ///
    /// In autocommit mode the write is applied and logged before returning.
    /// Otherwise it is staged on the top layer.
    ///
    /// # Errors
    ///
    /// In autocommit mode, returns the table's error; nothing is applied.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> CoreResult<Applied> {
        let key = key.into();
        let value = value.into();

        if let Some(top) = self.stack.last_mut() {
            top.set(key, value);
            return Ok(Applied::Staged);
        }

        let sequence = self.store.autocommit_put(&key, &value)?;
        let batch = WriteBatch::single_put(key, value);
        let report = self
            .store
            .record_flush(&self.origin(), CommitKind::Autocommit, sequence, &batch);
        Ok(Applied::Flushed(report))
    }

    /// Deletes `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// In autocommit mode, returns the table's error; nothing is applied.
    pub fn delete(&mut self, key: impl Into<String>) -> CoreResult<Applied> {
        let key = key.into();

        if let Some(top) = self.stack.last_mut() {
            top.delete(key);
            return Ok(Applied::Staged);
        }

        let sequence = self.store.autocommit_delete(&key)?;
        let batch = WriteBatch::single_delete(key);
        let report = self
            .store
            .record_flush(&self.origin(), CommitKind::Autocommit, sequence, &batch);
        Ok(Applied::Flushed(report))
    }

    /// Reads `key` as this session sees it.
    ///
    /// Layers are searched from the innermost out; the first that wrote or
    /// deleted the key decides. Otherwise the committed value is returned.
    ///
    /// # Errors
    ///
    /// Returns the table's error if the committed value cannot be read.
    pub fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        for layer in self.stack.iter().rev() {
            match layer.lookup(key) {
                Lookup::Written(value) => return Ok(Some(value.to_vec())),
                Lookup::Deleted => return Ok(None),
                Lookup::Untouched => {}
            }
        }
        self.store.get(key)
    }

    /// Commits the top layer.
    ///
    /// An inner layer is merged into its parent. The outermost layer is
    /// applied to the table as one batch and logged.
    ///
    /// # Errors
    ///
    /// - `NoActiveTransaction` at depth 0
    /// - `BatchApplyFailed` if the table rejected the outermost batch; the
    ///   layer is back on the stack and the table is unchanged
    pub fn commit(&mut self) -> CoreResult<Applied> {
        let layer = self.stack.pop().ok_or(CoreError::NoActiveTransaction)?;

        if let Some(parent) = self.stack.last_mut() {
            layer.merge_into(parent);
            self.store.stats().record_merge();
            tracing::debug!(depth = self.stack.len(), "merged layer into parent");
            return Ok(Applied::Merged);
        }

        let batch = layer.into_batch();
        match self.store.apply_batch(&batch) {
            Ok(sequence) => {
                self.store.stats().record_transaction_commit();
                let report =
                    self.store
                        .record_flush(&self.origin(), CommitKind::Transaction, sequence, &batch);
                Ok(Applied::Flushed(report))
            }
            Err(err) => {
                tracing::debug!(error = %err, "outermost commit failed, layer restored");
                self.stack.push(TransactionLayer::from_batch(batch));
                Err(err)
            }
        }
    }

    /// Discards the top layer.
    ///
    /// # Errors
    ///
    /// Returns `NoActiveTransaction` at depth 0.
    pub fn rollback(&mut self) -> CoreResult<Applied> {
        self.stack.pop().ok_or(CoreError::NoActiveTransaction)?;
        self.store.stats().record_rollback();
        tracing::debug!(depth = self.depth(), "rolled back layer");
        Ok(Applied::RolledBack)
    }
}
