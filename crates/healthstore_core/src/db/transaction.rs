//! Atomic write scopes.
//!
//! # Responsibility
//! - Run a closure inside one IMMEDIATE SQLite transaction.
//! - Allow nested scopes that join the outermost transaction.
//! - Collect the tables written inside the scope for change notification.
//!
//! # Invariants
//! - Only the outermost scope commits or rolls back.
//! - Dirty tables are reported only after a successful commit.
//! - An `Err` (or unwinding panic) leaves the database as it was before the
//!   outermost scope began.

use crate::db::schema::{delete_all_rows, Table};
use crate::db::DbError;
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

/// Handle to an open write transaction.
///
/// Dereferences to the transaction's connection for SQL access.
pub struct TxScope<'conn> {
    conn: &'conn Connection,
    depth: Cell<u32>,
    dirty: RefCell<BTreeSet<Table>>,
}

impl<'conn> TxScope<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            depth: Cell::new(1),
            dirty: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }

    /// Current nesting depth, `1` for the outermost scope.
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Records that `table` was written in this transaction.
    pub fn mark_dirty(&self, table: Table) {
        self.dirty.borrow_mut().insert(table);
    }

    pub fn dirty_tables(&self) -> BTreeSet<Table> {
        self.dirty.borrow().clone()
    }

    /// Runs `f` as a nested scope of this transaction.
    ///
    /// Nothing is committed when `f` returns; an error propagated out of the
    /// outermost closure rolls back the nested work as well.
    pub fn nested<T, E>(&self, f: impl FnOnce(&TxScope<'conn>) -> Result<T, E>) -> Result<T, E> {
        self.depth.set(self.depth.get() + 1);
        let result = f(self);
        self.depth.set(self.depth.get() - 1);
        result
    }

    /// Deletes every row of every store table inside this transaction.
    ///
    /// Storage reclamation is skipped: `VACUUM` cannot run inside a
    /// transaction.
    pub fn clear_all_tables(&self) -> Result<(), DbError> {
        delete_all_rows(self.conn)?;
        for table in Table::ALL {
            self.mark_dirty(table);
        }
        debug!("event=db_clear_all module=db status=ok vacuum=skipped reason=in_transaction");
        Ok(())
    }

    fn into_dirty(self) -> BTreeSet<Table> {
        self.dirty.into_inner()
    }
}

impl std::ops::Deref for TxScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
    }
}

/// Runs `f` in a new outermost transaction on `conn`.
///
/// Returns the closure value and the tables it marked dirty once committed.
pub fn run_in_transaction<T, E>(
    conn: &Connection,
    f: impl FnOnce(&TxScope<'_>) -> Result<T, E>,
) -> Result<(T, BTreeSet<Table>), E>
where
    E: From<rusqlite::Error>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let scope = TxScope::new(&tx);
    let value = f(&scope)?;
    let dirty = scope.into_dirty();
    tx.commit()?;
    Ok((value, dirty))
}

#[cfg(test)]
mod tests {
    use super::run_in_transaction;
    use crate::db::open_db_in_memory;
    use crate::db::schema::Table;

    fn profile_count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM user_profiles;", [], |row| row.get(0))
            .unwrap()
    }

    const INSERT_PROFILE: &str = "INSERT INTO user_profiles
        (id, name, birth_year, birth_month, birth_day, height, language, insight_language)
        VALUES (?1, 'p', 1990, 1, 1, 170.0, 'en', 'en');";

    #[test]
    fn commit_reports_dirty_tables() {
        let conn = open_db_in_memory().unwrap();
        let ((), dirty) = run_in_transaction::<_, rusqlite::Error>(&conn, |tx| {
            tx.execute(INSERT_PROFILE, [1])?;
            tx.mark_dirty(Table::UserProfiles);
            Ok(())
        })
        .unwrap();

        assert_eq!(profile_count(&conn), 1);
        assert!(dirty.contains(&Table::UserProfiles));
        assert!(conn.is_autocommit());
    }

    #[test]
    fn nested_error_rolls_back_outer_scope() {
        let conn = open_db_in_memory().unwrap();
        let result = run_in_transaction::<(), rusqlite::Error>(&conn, |tx| {
            tx.execute(INSERT_PROFILE, [1])?;
            tx.nested(|inner| {
                assert_eq!(inner.depth(), 2);
                inner.execute(INSERT_PROFILE, [2])?;
                Err(rusqlite::Error::InvalidQuery)
            })
        });

        assert!(result.is_err());
        assert_eq!(profile_count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn nested_success_commits_with_outer_scope_only() {
        let conn = open_db_in_memory().unwrap();
        run_in_transaction::<_, rusqlite::Error>(&conn, |tx| {
            tx.nested(|inner| inner.execute(INSERT_PROFILE, [7]))?;
            assert!(!tx.is_autocommit());
            assert_eq!(tx.depth(), 1);
            Ok(())
        })
        .unwrap();

        assert_eq!(profile_count(&conn), 1);
    }
}
