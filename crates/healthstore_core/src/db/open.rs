//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by store behavior.
//! - Migrate and validate the schema before returning a usable connection,
//!   falling back to destructive recreation when configured.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations applied and a validated schema.
//! - File connections use the WAL journal.

use super::config::DbConfig;
use super::migrations::apply_migrations;
use super::schema::{drop_all_tables, validate_schema};
use super::DbResult;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    File,
    Memory,
}

impl OpenMode {
    fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens a SQLite database file with default options.
///
/// # Side effects
/// - Performs connection bootstrap, migration and validation.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with(path, &DbConfig::default())
}

/// Opens a SQLite database file with explicit options.
pub fn open_db_with(path: impl AsRef<Path>, config: &DbConfig) -> DbResult<Connection> {
    let path = path.as_ref();
    open_logged(OpenMode::File, config, || Connection::open(path))
}

/// Opens an in-memory SQLite database with default options.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_in_memory_with(&DbConfig::default())
}

/// Opens an in-memory SQLite database with explicit options.
pub fn open_db_in_memory_with(config: &DbConfig) -> DbResult<Connection> {
    open_logged(OpenMode::Memory, config, Connection::open_in_memory)
}

fn open_logged(
    mode: OpenMode,
    config: &DbConfig,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={}",
        mode.label()
    );

    let mut conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode.label(),
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, mode, config) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode.label(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode.label(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, mode: OpenMode, config: &DbConfig) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(config.busy_timeout)?;
    if mode == OpenMode::File {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
    }

    let created = match prepare_schema(conn) {
        Ok(created) => created,
        Err(err) if config.fallback_to_destructive_migration && err.is_schema_drift() => {
            warn!(
                "event=db_destructive_migration module=db status=start mode={} reason={}",
                mode.label(),
                err
            );
            recreate_schema(conn)?;
            config.notify_destructive_migration(conn);
            false
        }
        Err(err) => return Err(err),
    };

    if created {
        config.notify_create(conn);
    }
    config.notify_open(conn);
    Ok(())
}

/// Migrates and validates; returns whether the schema was freshly created.
fn prepare_schema(conn: &mut Connection) -> DbResult<bool> {
    let outcome = apply_migrations(conn)?;
    validate_schema(conn)?;
    Ok(outcome.created_schema())
}

fn recreate_schema(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    drop_all_tables(&tx)?;
    tx.execute_batch("PRAGMA user_version = 0;")?;
    tx.commit()?;

    apply_migrations(conn)?;
    validate_schema(conn)?;
    info!("event=db_destructive_migration module=db status=ok");
    Ok(())
}
