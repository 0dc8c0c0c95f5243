//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically and stamp the schema identity token.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - The identity token is rewritten in the same transaction as any migration.

use crate::db::schema::{validate_existing_tables, write_identity_hash};
use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Result of one migration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationOutcome {
    /// Returns whether this pass created the schema from scratch.
    pub fn created_schema(&self) -> bool {
        self.from_version == 0 && self.to_version > 0
    }

    pub fn applied_any(&self) -> bool {
        self.from_version != self.to_version
    }
}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// The version is read under an IMMEDIATE lock, so concurrent first opens
/// of one file apply each migration once. Store tables found in an
/// unversioned file must already match the declared layout, otherwise the
/// pass fails with `SchemaMismatch` before any SQL runs.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationOutcome> {
    let latest = latest_version();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current_version = current_user_version(&tx)?;

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    let outcome = MigrationOutcome {
        from_version: current_version,
        to_version: latest,
    };
    if !outcome.applied_any() {
        return Ok(outcome);
    }
    if current_version == 0 {
        validate_existing_tables(&tx)?;
    }

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    write_identity_hash(&tx)?;
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        current_version, latest
    );
    Ok(outcome)
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
