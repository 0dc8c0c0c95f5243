//! Connection options and lifecycle hooks.

use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application hooks invoked while a database is opened.
///
/// All methods default to no-ops. Hooks run on the opening thread with the
/// bootstrap connection; they must not open another store on the same file.
pub trait DbCallback: Send + Sync {
    /// Called once after the schema was created in an empty database.
    fn on_create(&self, _conn: &Connection) {}

    /// Called after every successful open, once the schema is valid.
    fn on_open(&self, _conn: &Connection) {}

    /// Called after drifted tables were dropped and recreated empty.
    fn on_destructive_migration(&self, _conn: &Connection) {}
}

/// Options for opening a health database.
#[derive(Clone)]
pub struct DbConfig {
    /// Drop and recreate all tables when the stored schema cannot be used.
    pub fallback_to_destructive_migration: bool,
    /// How long a writer waits on SQLite's lock before failing.
    pub busy_timeout: Duration,
    pub callbacks: Vec<Arc<dyn DbCallback>>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            fallback_to_destructive_migration: false,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            callbacks: Vec::new(),
        }
    }
}

impl Debug for DbConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field(
                "fallback_to_destructive_migration",
                &self.fallback_to_destructive_migration,
            )
            .field("busy_timeout", &self.busy_timeout)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fallback_to_destructive_migration(mut self, enabled: bool) -> Self {
        self.fallback_to_destructive_migration = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn add_callback(mut self, callback: Arc<dyn DbCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub(crate) fn notify_create(&self, conn: &Connection) {
        for callback in &self.callbacks {
            callback.on_create(conn);
        }
    }

    pub(crate) fn notify_open(&self, conn: &Connection) {
        for callback in &self.callbacks {
            callback.on_open(conn);
        }
    }

    pub(crate) fn notify_destructive_migration(&self, conn: &Connection) {
        for callback in &self.callbacks {
            callback.on_destructive_migration(conn);
        }
    }
}
