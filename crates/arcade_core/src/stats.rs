//! Store statistics.
//!
//! ```rust
//! use arcade_core::Store;
//!
//! let store = Store::open_in_memory().unwrap();
//! let mut session = store.new_session();
//! session.set("k", b"v".to_vec()).unwrap();
//!
//! let stats = store.stats().snapshot();
//! assert_eq!(stats.autocommits, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Store counters.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct StoreStats {
    reads: AtomicU64,
    autocommits: AtomicU64,
    begins: AtomicU64,
    merges: AtomicU64,
    transactions_committed: AtomicU64,
    rollbacks: AtomicU64,
    flush_failures: AtomicU64,
    log_append_failures: AtomicU64,
}

impl StoreStats {
    /// Creates zeroed stats.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_autocommit(&self) {
        self.autocommits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_begin(&self) {
        self.begins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_merge(&self) {
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_log_append_failure(&self) {
        self.log_append_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of committed reads that reached the table.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of successful autocommit writes and deletes.
    pub fn autocommits(&self) -> u64 {
        self.autocommits.load(Ordering::Relaxed)
    }

    /// Returns the number of transaction layers begun.
    pub fn begins(&self) -> u64 {
        self.begins.load(Ordering::Relaxed)
    }

    /// Returns the number of inner commits merged into a parent layer.
    pub fn merges(&self) -> u64 {
        self.merges.load(Ordering::Relaxed)
    }

    /// Returns the number of successful outermost commits.
    pub fn transactions_committed(&self) -> u64 {
        self.transactions_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of rolled back layers.
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Returns the number of flushes the table rejected.
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of commit log appends that failed.
    pub fn log_append_failures(&self) -> u64 {
        self.log_append_failures.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads(),
            autocommits: self.autocommits(),
            begins: self.begins(),
            merges: self.merges(),
            transactions_committed: self.transactions_committed(),
            rollbacks: self.rollbacks(),
            flush_failures: self.flush_failures(),
            log_append_failures: self.log_append_failures(),
        }
    }
}

/// A point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Committed reads that reached the table.
    pub reads: u64,
    /// Successful autocommit writes and deletes.
    pub autocommits: u64,
    /// Transaction layers begun.
    pub begins: u64,
    /// Inner commits merged into a parent layer.
    pub merges: u64,
    /// Successful outermost commits.
    pub transactions_committed: u64,
    /// Rolled back layers.
    pub rollbacks: u64,
    /// Flushes the table rejected.
    pub flush_failures: u64,
    /// Failed commit log appends.
    pub log_append_failures: u64,
}
