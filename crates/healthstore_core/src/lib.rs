//! Local persistence core for the health tracker.
//! Owns the store schema, record access, change notification and atomic
//! write scopes.

pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use db::{DbCallback, DbConfig, DbError, DbResult, HealthDatabase, Table, TxScope};
pub use export::TransferError;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::almanac::AlmanacEntry;
pub use model::health_record::{HealthRecord, NEW_RECORD_ID};
pub use model::reading::{combine_readings, Reading, ReadingMethod};
pub use model::user_profile::UserProfile;
pub use model::validation::ValidationError;
pub use model::{RecordId, UserId};
pub use notify::{InvalidationTracker, QueryView, SubscriptionId};
pub use repo::{RepoError, RepoResult};
pub use service::health_store::{HealthStore, StoreTx};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
