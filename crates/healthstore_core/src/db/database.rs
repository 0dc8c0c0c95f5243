//! Shared database handle: one connection, write scopes and live queries.
//!
//! # Responsibility
//! - Own the single store connection and serialize access to it.
//! - Publish tables touched by committed write scopes to the notifier.
//! - Provide the clear-all maintenance operation.
//!
//! # Invariants
//! - Notifications are sent only after commit and after the connection lock
//!   is released.
//! - Readers never observe an uncommitted write scope.
//! - A thread holding the connection gets `ReentrantAccess` instead of
//!   blocking on itself.

use super::config::DbConfig;
use super::open::{open_db_in_memory_with, open_db_with};
use super::schema::{delete_all_rows, Table};
use super::transaction::{run_in_transaction, TxScope};
use super::{DbError, DbResult};
use crate::notify::{lock_unpoisoned, InvalidationTracker};
use log::{info, warn};
use rusqlite::Connection;
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Instant;

/// Opened and validated health database.
pub struct HealthDatabase {
    tracker: InvalidationTracker,
    conn: Arc<Mutex<Connection>>,
    holder: Mutex<Option<ThreadId>>,
}

impl HealthDatabase {
    /// Opens (creating when absent) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, config: &DbConfig) -> DbResult<Self> {
        Self::from_connection(open_db_with(path, config)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(config: &DbConfig) -> DbResult<Self> {
        Self::from_connection(open_db_in_memory_with(config)?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        let conn = Arc::new(Mutex::new(conn));
        let tracker = InvalidationTracker::start(Arc::downgrade(&conn))?;
        Ok(Self {
            tracker,
            conn,
            holder: Mutex::new(None),
        })
    }

    /// Runs `f` atomically; see [`TxScope`] for nesting rules.
    ///
    /// Tables marked dirty inside `f` are published once the commit succeeds.
    /// Nest through the scope handed to `f`: calling back into this handle
    /// from `f` fails with [`DbError::ReentrantAccess`].
    pub fn transaction<T, E>(&self, f: impl FnOnce(&TxScope<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error> + From<DbError>,
    {
        let (value, dirty) = {
            let conn = self.lock()?;
            run_in_transaction(&conn, f)?
        };
        self.tracker.notify(dirty);
        Ok(value)
    }

    /// Runs a read-only closure against the committed state.
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Deletes every row from every store table, then reclaims file space.
    ///
    /// Observers are notified as soon as the delete commits. Reclamation
    /// (`wal_checkpoint(FULL)` + `VACUUM`) is best effort: a failure is
    /// logged and the call still succeeds.
    pub fn clear_all_tables(&self) -> DbResult<()> {
        let started_at = Instant::now();
        let dirty = {
            let conn = self.lock()?;
            let ((), dirty) = run_in_transaction::<_, DbError>(&conn, |tx| {
                delete_all_rows(tx.conn())?;
                for table in Table::ALL {
                    tx.mark_dirty(table);
                }
                Ok(())
            })?;
            dirty
        };
        self.tracker.notify(dirty);

        if let Err(err) = self.reclaim_space() {
            warn!(
                "event=db_clear_all module=db status=degraded step=reclaim error={}",
                err
            );
        }
        info!(
            "event=db_clear_all module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    pub fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    fn reclaim_space(&self) -> DbResult<()> {
        let conn = self.lock()?;
        let busy: i64 = conn.query_row("PRAGMA wal_checkpoint(FULL);", [], |row| row.get(0))?;
        if busy != 0 {
            warn!("event=db_clear_all module=db status=degraded step=checkpoint busy=1");
        }
        if conn.is_autocommit() {
            conn.execute_batch("VACUUM;")?;
        }
        Ok(())
    }

    /// Locks the connection, refusing a second lock from the holding thread.
    fn lock(&self) -> DbResult<ConnGuard<'_>> {
        let current = thread::current().id();
        if *lock_unpoisoned(&self.holder) == Some(current) {
            warn!("event=db_lock module=db status=error error_code=reentrant_access");
            return Err(DbError::ReentrantAccess);
        }
        let conn = lock_unpoisoned(&self.conn);
        *lock_unpoisoned(&self.holder) = Some(current);
        Ok(ConnGuard {
            holder: &self.holder,
            conn,
        })
    }
}

struct ConnGuard<'db> {
    holder: &'db Mutex<Option<ThreadId>>,
    conn: MutexGuard<'db, Connection>,
}

impl Deref for ConnGuard<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for ConnGuard<'_> {
    // Runs before `conn` is dropped, so the holder is cleared while the
    // connection lock is still held.
    fn drop(&mut self) {
        *lock_unpoisoned(self.holder) = None;
    }
}
