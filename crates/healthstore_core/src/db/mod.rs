//! SQLite storage bootstrap, schema management and write scopes.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the health store.
//! - Apply schema migrations in deterministic order and validate the result
//!   against the expected table layout.
//! - Scope writes in transactions and hand touched tables to the notifier.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - The expected schema fingerprint is stored in `schema_meta`.
//! - Core code must not read/write application data before validation succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod config;
mod database;
pub mod migrations;
mod open;
pub mod schema;
pub mod transaction;

pub use config::{DbCallback, DbConfig};
pub use database::HealthDatabase;
pub use open::{open_db, open_db_in_memory, open_db_in_memory_with, open_db_with};
pub use schema::Table;
pub use transaction::TxScope;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Live table layout differs from the expected column set.
    SchemaMismatch {
        table: &'static str,
        expected: String,
        found: String,
    },
    /// Stored schema fingerprint differs from the one compiled into this binary.
    IdentityMismatch {
        expected: String,
        found: Option<String>,
    },
    /// The calling thread already holds the store connection, e.g. a store
    /// method called from inside its own `batch` closure.
    ReentrantAccess,
}

impl DbError {
    /// Returns whether this error means stored schema drifted from code.
    ///
    /// Only drift errors are eligible for destructive recreation.
    pub fn is_schema_drift(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSchemaVersion { .. }
                | Self::SchemaMismatch { .. }
                | Self::IdentityMismatch { .. }
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch {
                table,
                expected,
                found,
            } => write!(
                f,
                "schema validation failed for `{table}`: expected {expected}, found {found}"
            ),
            Self::IdentityMismatch { expected, found } => write!(
                f,
                "schema identity mismatch: expected {expected}, found {}",
                found.as_deref().unwrap_or("<none>")
            ),
            Self::ReentrantAccess => write!(
                f,
                "store connection is already held by this thread; use the open write scope"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::SchemaMismatch { .. }
            | Self::IdentityMismatch { .. }
            | Self::ReentrantAccess => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
