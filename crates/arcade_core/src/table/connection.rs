//! A single caller's handle onto the table.

use crate::batch::WriteBatch;
use crate::error::{CoreError, CoreResult};
use crate::table::{BackingStore, TableManager};
use crate::types::SequenceNumber;
use arcade_storage::StorageBackend;
use std::sync::Arc;

/// A connection to the table.
///
/// Each connection owns its own reader handle, so no storage handle is ever
/// shared between two concurrent callers. Writes go through the table's
/// single writer.
pub struct Connection {
    id: u64,
    table: Arc<TableManager>,
    reader: Box<dyn StorageBackend>,
}

impl Connection {
    /// Opens a new connection with a fresh reader handle.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if no handle can be opened.
    pub fn open(id: u64, table: Arc<TableManager>) -> CoreResult<Self> {
        let reader = table.open_reader()?;
        Ok(Self { id, table, reader })
    }

    /// Returns the connection id, unique within its pool.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns every committed row ordered by key.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a value cannot be read.
    pub fn scan(&self) -> CoreResult<Vec<(String, Vec<u8>)>> {
        self.table.scan(self.reader.as_ref())
    }
}

impl BackingStore for Connection {
    fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        self.table.read(self.reader.as_ref(), key)
    }

    fn set(&self, key: &str, value: &[u8]) -> CoreResult<SequenceNumber> {
        self.table.apply(&WriteBatch::single_put(key, value))
    }

    fn delete(&self, key: &str) -> CoreResult<SequenceNumber> {
        self.table.apply(&WriteBatch::single_delete(key))
    }

    fn batch_apply(&self, batch: &WriteBatch) -> CoreResult<SequenceNumber> {
        self.table
            .apply(batch)
            .map_err(CoreError::batch_apply_failed)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
