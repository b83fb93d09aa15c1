//! Connection pooling.

use crate::error::CoreResult;
use crate::table::{Connection, TableManager};
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out connections, one per concurrent caller.
///
/// A connection is checked out for the duration of one operation and comes
/// back when its [`PooledConnection`] guard drops, on success and error
/// paths alike. At most `max_idle` connections are kept for reuse.
pub struct ConnectionPool {
    table: Arc<TableManager>,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
    next_id: AtomicU64,
}

impl ConnectionPool {
    /// Creates an empty pool over `table`.
    pub fn new(table: Arc<TableManager>, max_idle: usize) -> Self {
        Self {
            table,
            idle: Mutex::new(Vec::new()),
            max_idle,
            next_id: AtomicU64::new(1),
        }
    }

    /// Checks out a connection, opening a new one if none is idle.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if a new connection cannot be opened.
    pub fn get(&self) -> CoreResult<PooledConnection<'_>> {
        let reused = self.idle.lock().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(connection = id, "opening table connection");
                Connection::open(id, Arc::clone(&self.table))?
            }
        };
        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }

    /// Returns the number of idle connections.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns the number of connections opened so far.
    #[must_use]
    pub fn opened_count(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("idle", &self.idle_count())
            .field("opened", &self.opened_count())
            .field("max_idle", &self.max_idle)
            .finish_non_exhaustive()
    }
}

/// A checked-out connection, returned to its pool on drop.
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `Drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::WriteBatch;
    use crate::config::Config;
    use crate::error::CoreError;
    use crate::table::BackingStore;
    use arcade_storage::InMemoryBackend;
    use std::time::Duration;

    fn pool(max_idle: usize) -> ConnectionPool {
        let table = TableManager::open(Box::new(InMemoryBackend::new()), &Config::default()).unwrap();
        ConnectionPool::new(Arc::new(table), max_idle)
    }

    #[test]
    fn connection_is_returned_on_drop() {
        let pool = pool(4);
        {
            let conn = pool.get().unwrap();
            conn.set("k", b"v").unwrap();
            assert_eq!(pool.idle_count(), 0);
        }
        assert_eq!(pool.idle_count(), 1);

        let conn = pool.get().unwrap();
        assert_eq!(conn.id(), 1);
        assert_eq!(conn.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(pool.opened_count(), 1);
    }

    #[test]
    fn concurrent_checkouts_get_distinct_connections() {
        let pool = pool(4);
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        assert_ne!(a.id(), b.id());
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn idle_connections_are_capped() {
        let pool = pool(1);
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn connection_is_returned_after_failure() {
        let table = TableManager::open(
            Box::new(InMemoryBackend::new()),
            &Config::default().busy_timeout(Duration::from_millis(5)),
        )
        .unwrap();
        let table = Arc::new(table);
        let pool = ConnectionPool::new(Arc::clone(&table), 4);

        let held = table.lock_writer_for_test();
        let result = std::thread::scope(|scope| {
            scope
                .spawn(|| pool.get().and_then(|conn| conn.batch_apply(&WriteBatch::single_put("k", "v"))))
                .join()
                .unwrap()
        });
        drop(held);

        match result {
            Err(CoreError::BatchApplyFailed { source }) => {
                assert!(matches!(*source, CoreError::StoreBusy { .. }));
            }
            other => panic!("expected busy failure, got {other:?}"),
        }
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.get().unwrap().get("k").unwrap(), None);
    }
}
