//! The store: table, connection pool, commit log and statistics.

use crate::batch::WriteBatch;
use crate::commit_log::{CommitLogSink, CommitRecord, JsonLinesCommitLog, MemoryCommitLog};
use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::session::{FlushReport, Session};
use crate::stats::StoreStats;
use crate::table::{
    verify, BackingStore, ConnectionPool, PooledConnection, TableManager, VerifyReport,
};
use crate::types::{CommitKind, SequenceNumber};
use arcade_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::Path;
use std::sync::Arc;

/// A durable key-value store that hands out sessions.
///
/// Sessions borrow the store, so a `Store` outlives every session created
/// from it. The store is `Sync`; share it by reference across threads.
///
/// # Example
///
/// ```rust
/// use arcade_core::Store;
///
/// let store = Store::open_in_memory().unwrap();
/// let mut session = store.new_session();
/// session.set("greeting", b"hello".to_vec()).unwrap();
///
/// assert_eq!(store.get("greeting").unwrap(), Some(b"hello".to_vec()));
/// assert_eq!(store.read_commit_log().unwrap().len(), 1);
/// ```
pub struct Store {
    config: Config,
    dir: Option<StoreDir>,
    table: Arc<TableManager>,
    pool: ConnectionPool,
    commit_log: Option<Box<dyn CommitLogSink>>,
    stats: StoreStats,
}

impl Store {
    /// Opens the store directory at `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another process holds the directory, or an
    /// error if the table cannot be opened or recovered.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the store directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another process holds the directory, or an
    /// error if the table cannot be opened or recovered.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(path, &config)?;
        let backend = FileBackend::open(&dir.table_path())?;
        let sink = JsonLinesCommitLog::open(&dir.commit_log_path())?;

        tracing::info!(path = %path.display(), "opening store");
        let mut store = Self::with_parts(Box::new(backend), Box::new(sink), config)?;
        store.dir = Some(dir);
        Ok(store)
    }

    /// Opens an empty store held in memory.
    ///
    /// # Errors
    ///
    /// Fails only if the table cannot be initialized.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::with_parts(
            Box::new(InMemoryBackend::new()),
            Box::new(MemoryCommitLog::new()),
            Config::default(),
        )
    }

    /// Builds a store from a table backend and a commit log sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the table in `backend` is damaged.
    pub fn with_parts(
        backend: Box<dyn StorageBackend>,
        sink: Box<dyn CommitLogSink>,
        config: Config,
    ) -> CoreResult<Self> {
        let table = Arc::new(TableManager::open(backend, &config)?);
        let pool = ConnectionPool::new(Arc::clone(&table), config.max_idle_connections);
        let commit_log = config.commit_log.then_some(sink);

        Ok(Self {
            config,
            dir: None,
            table,
            pool,
            commit_log,
            stats: StoreStats::new(),
        })
    }

    /// Creates a new session in autocommit mode.
    #[must_use]
    pub fn new_session(&self) -> Session<'_> {
        Session::new(self)
    }

    /// Reads the committed value of `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` or a storage error if the table cannot be
    /// read.
    pub fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        let conn = self.connection()?;
        self.stats.record_read();
        conn.get(key)
    }

    /// Returns every committed row, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn dump(&self) -> CoreResult<Vec<(String, Vec<u8>)>> {
        self.connection()?.scan()
    }

    /// Returns the number of committed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no key is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the sequence number of the last flush.
    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        self.table.last_sequence()
    }

    /// Returns the commit log sink, if logging is enabled.
    #[must_use]
    pub fn commit_log(&self) -> Option<&dyn CommitLogSink> {
        self.commit_log.as_deref()
    }

    /// Reads the whole commit log. Empty when logging is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn read_commit_log(&self) -> CoreResult<Vec<CommitRecord>> {
        self.commit_log
            .as_ref()
            .map_or_else(|| Ok(Vec::new()), |sink| sink.read_all())
    }

    /// Checks every frame of the table.
    ///
    /// # Errors
    ///
    /// Returns the first corruption found.
    pub fn verify(&self) -> CoreResult<VerifyReport> {
        let reader = self.table.open_reader()?;
        verify(reader.as_ref())
    }

    /// Returns the store counters.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Returns the store options.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the store directory for on-disk stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub(crate) fn connection(&self) -> CoreResult<PooledConnection<'_>> {
        self.pool.get()
    }

    pub(crate) fn autocommit_put(&self, key: &str, value: &[u8]) -> CoreResult<SequenceNumber> {
        let result = self.connection().and_then(|conn| conn.set(key, value));
        self.track_flush(result)
    }

    pub(crate) fn autocommit_delete(&self, key: &str) -> CoreResult<SequenceNumber> {
        let result = self.connection().and_then(|conn| conn.delete(key));
        self.track_flush(result)
    }

    pub(crate) fn apply_batch(&self, batch: &WriteBatch) -> CoreResult<SequenceNumber> {
        let result = self
            .connection()
            .map_err(CoreError::batch_apply_failed)
            .and_then(|conn| conn.batch_apply(batch));
        self.track_flush(result)
    }

    fn track_flush(&self, result: CoreResult<SequenceNumber>) -> CoreResult<SequenceNumber> {
        if let Err(err) = &result {
            self.stats.record_flush_failure();
            tracing::debug!(error = %err, "flush rejected");
        }
        result
    }

    /// Records a successful flush in the commit log.
    ///
    /// An append failure is returned in the report and never undoes the
    /// flush.
    pub(crate) fn record_flush(
        &self,
        origin: &str,
        kind: CommitKind,
        sequence: SequenceNumber,
        batch: &WriteBatch,
    ) -> FlushReport {
        if kind == CommitKind::Autocommit {
            self.stats.record_autocommit();
        }

        let log_error = self.commit_log.as_ref().and_then(|sink| {
            let record = CommitRecord::new(origin, kind, sequence, batch);
            sink.append(&record).err()
        });

        if let Some(err) = &log_error {
            self.stats.record_log_append_failure();
            tracing::warn!(%sequence, %kind, error = %err, "commit log append failed");
        } else {
            tracing::debug!(%sequence, %kind, ops = batch.len(), origin, "flushed");
        }

        FlushReport {
            sequence,
            log_error,
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path())
            .field("table", &self.table)
            .field("pool", &self.pool)
            .field("commit_log", &self.commit_log.is_some())
            .finish_non_exhaustive()
    }
}
