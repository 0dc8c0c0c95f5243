//! Health store use-case facade.
//!
//! # Responsibility
//! - Expose the store operations used by UI and business-logic callers.
//! - Scope every mutation in a write transaction and mark the tables it
//!   touches so live views refresh after commit.
//! - Build live views over the per-table repositories.
//!
//! # Invariants
//! - Each mutating call is atomic on its own. Inside [`HealthStore::batch`]
//!   the [`StoreTx`] methods join the caller's transaction; calling back into
//!   the `HealthStore` itself from the closure fails with
//!   `DbError::ReentrantAccess`.
//! - A failed call leaves every table unchanged and notifies nobody.

use crate::db::{DbConfig, DbResult, HealthDatabase, Table, TxScope};
use crate::export::csv::{read_records_csv, records_to_csv};
use crate::export::TransferError;
use crate::model::almanac::AlmanacEntry;
use crate::model::health_record::HealthRecord;
use crate::model::reading::{combine_readings, Reading, ReadingMethod};
use crate::model::user_profile::UserProfile;
use crate::model::{RecordId, UserId};
use crate::notify::QueryView;
use crate::repo::almanac_repo::{AlmanacRepository, SqliteAlmanacRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::repo::record_repo::{RecordRepository, SqliteRecordRepository};
use crate::repo::RepoResult;
use log::{debug, info};
use std::io::Read;
use std::path::Path;

/// Store facade over one [`HealthDatabase`].
pub struct HealthStore {
    db: HealthDatabase,
}

impl HealthStore {
    pub fn new(db: HealthDatabase) -> Self {
        Self { db }
    }

    /// Opens the store file at `path`, creating or validating its schema.
    pub fn open(path: impl AsRef<Path>, config: &DbConfig) -> DbResult<Self> {
        Ok(Self::new(HealthDatabase::open(path, config)?))
    }

    pub fn open_in_memory(config: &DbConfig) -> DbResult<Self> {
        Ok(Self::new(HealthDatabase::open_in_memory(config)?))
    }

    pub fn database(&self) -> &HealthDatabase {
        &self.db
    }

    /// Runs several operations as one atomic unit.
    ///
    /// Observers are notified once, after the whole batch commits. Use the
    /// [`StoreTx`] handed to `f` for every operation; `self` is locked until
    /// `f` returns.
    pub fn batch<T>(&self, f: impl FnOnce(&StoreTx<'_, '_>) -> RepoResult<T>) -> RepoResult<T> {
        self.db.transaction(|tx| f(&StoreTx::new(tx)))
    }

    /// Inserts or replaces one record; `id == 0` assigns a new identity.
    pub fn insert_record(&self, record: &HealthRecord) -> RepoResult<RecordId> {
        self.batch(|tx| tx.insert_record(record))
    }

    /// Inserts or replaces all records; either all persist or none do.
    pub fn insert_all(&self, records: &[HealthRecord]) -> RepoResult<Vec<RecordId>> {
        self.batch(|tx| tx.insert_all(records))
    }

    /// Combines one measuring session into a single new record.
    ///
    /// Returns `None` without writing when `readings` is empty.
    pub fn insert_session(
        &self,
        user_id: UserId,
        date: &str,
        readings: &[Reading],
        method: ReadingMethod,
    ) -> RepoResult<Option<RecordId>> {
        let Some(combined) = combine_readings(readings, method) else {
            return Ok(None);
        };
        let id = self.insert_record(&combined.into_record(user_id, date))?;
        debug!(
            "event=record_session module=store status=ok record_id={} readings={} method={:?}",
            id,
            readings.len(),
            method
        );
        Ok(Some(id))
    }

    pub fn insert_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        self.batch(|tx| tx.insert_profile(profile))
    }

    pub fn insert_almanac(&self, entry: &AlmanacEntry) -> RepoResult<()> {
        self.batch(|tx| tx.insert_almanac(entry))
    }

    /// Deletes one profile; returns `0` when it did not exist.
    pub fn delete_profile(&self, id: UserId) -> RepoResult<usize> {
        self.batch(|tx| tx.delete_profile(id))
    }

    /// Deletes a profile together with all of its records.
    pub fn delete_profile_with_records(&self, user_id: UserId) -> RepoResult<usize> {
        self.batch(|tx| tx.delete_profile_with_records(user_id))
    }

    pub fn delete_record(&self, id: RecordId) -> RepoResult<usize> {
        self.batch(|tx| tx.delete_record(id))
    }

    pub fn delete_records_by_user(&self, user_id: UserId) -> RepoResult<usize> {
        self.batch(|tx| tx.delete_records_by_user(user_id))
    }

    /// Deletes every row of every table and reclaims file space.
    pub fn clear_all(&self) -> DbResult<()> {
        self.db.clear_all_tables()
    }

    /// Live view of a user's records, most recent date first.
    pub fn records_by_user(&self, user_id: UserId) -> QueryView<Vec<HealthRecord>> {
        self.db
            .tracker()
            .subscribe(&[Table::HealthRecords], move |conn| {
                SqliteRecordRepository::new(conn).records_by_user(user_id)
            })
    }

    /// Live view of all profiles, ordered by id.
    pub fn all_profiles(&self) -> QueryView<Vec<UserProfile>> {
        self.db
            .tracker()
            .subscribe(&[Table::UserProfiles], |conn| {
                SqliteProfileRepository::new(conn).all_profiles()
            })
    }

    /// Live view of the almanac entry for `date`, `None` while absent.
    pub fn almanac_by_date(&self, date: impl Into<String>) -> QueryView<Option<AlmanacEntry>> {
        let date = date.into();
        self.db
            .tracker()
            .subscribe(&[Table::AlmanacData], move |conn| {
                SqliteAlmanacRepository::new(conn).almanac_by_date(&date)
            })
    }

    pub fn load_records_by_user(&self, user_id: UserId) -> RepoResult<Vec<HealthRecord>> {
        self.db
            .read(|conn| SqliteRecordRepository::new(conn).records_by_user(user_id))
    }

    pub fn load_profiles(&self) -> RepoResult<Vec<UserProfile>> {
        self.db
            .read(|conn| SqliteProfileRepository::new(conn).all_profiles())
    }

    pub fn load_profile(&self, id: UserId) -> RepoResult<Option<UserProfile>> {
        self.db
            .read(|conn| SqliteProfileRepository::new(conn).get_profile(id))
    }

    pub fn load_almanac(&self, date: &str) -> RepoResult<Option<AlmanacEntry>> {
        self.db
            .read(|conn| SqliteAlmanacRepository::new(conn).almanac_by_date(date))
    }

    /// Id to use for a newly created user profile.
    pub fn next_profile_id(&self) -> RepoResult<UserId> {
        self.db
            .read(|conn| SqliteProfileRepository::new(conn).next_profile_id())
    }

    /// Exports a user's records as `Date,SBP,DBP,HR,Weight` CSV.
    pub fn export_records_csv(&self, user_id: UserId) -> Result<String, TransferError> {
        let records = self.load_records_by_user(user_id)?;
        let text = records_to_csv(&records)?;
        info!(
            "event=records_export module=store status=ok user_id={} count={}",
            user_id,
            records.len()
        );
        Ok(text)
    }

    /// Imports CSV rows as new records for `user_id` in one atomic batch.
    pub fn import_records_csv(
        &self,
        user_id: UserId,
        reader: impl Read,
    ) -> Result<Vec<RecordId>, TransferError> {
        let records = read_records_csv(reader, user_id)?;
        let ids = self.insert_all(&records)?;
        info!(
            "event=records_import module=store status=ok user_id={} count={}",
            user_id,
            ids.len()
        );
        Ok(ids)
    }
}

/// Mutating store operations bound to an open write transaction.
pub struct StoreTx<'scope, 'conn> {
    scope: &'scope TxScope<'conn>,
}

impl<'scope, 'conn> StoreTx<'scope, 'conn> {
    pub fn new(scope: &'scope TxScope<'conn>) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &'scope TxScope<'conn> {
        self.scope
    }

    /// Runs `f` as a nested scope of this transaction.
    pub fn nested<T>(&self, f: impl FnOnce(&StoreTx<'_, 'conn>) -> RepoResult<T>) -> RepoResult<T> {
        self.scope.nested(|scope| f(&StoreTx::new(scope)))
    }

    pub fn insert_record(&self, record: &HealthRecord) -> RepoResult<RecordId> {
        let id = SqliteRecordRepository::new(self.scope.conn()).insert_record(record)?;
        self.scope.mark_dirty(Table::HealthRecords);
        debug!(
            "event=record_upsert module=store status=ok record_id={} user_id={}",
            id, record.user_id
        );
        Ok(id)
    }

    pub fn insert_all(&self, records: &[HealthRecord]) -> RepoResult<Vec<RecordId>> {
        let ids = SqliteRecordRepository::new(self.scope.conn()).insert_all(records)?;
        if !ids.is_empty() {
            self.scope.mark_dirty(Table::HealthRecords);
        }
        debug!(
            "event=record_upsert_batch module=store status=ok count={}",
            ids.len()
        );
        Ok(ids)
    }

    pub fn insert_profile(&self, profile: &UserProfile) -> RepoResult<()> {
        SqliteProfileRepository::new(self.scope.conn()).insert_profile(profile)?;
        self.scope.mark_dirty(Table::UserProfiles);
        debug!(
            "event=profile_upsert module=store status=ok user_id={}",
            profile.id
        );
        Ok(())
    }

    pub fn insert_almanac(&self, entry: &AlmanacEntry) -> RepoResult<()> {
        SqliteAlmanacRepository::new(self.scope.conn()).insert_almanac(entry)?;
        self.scope.mark_dirty(Table::AlmanacData);
        Ok(())
    }

    pub fn delete_profile(&self, id: UserId) -> RepoResult<usize> {
        let changed = SqliteProfileRepository::new(self.scope.conn()).delete_profile(id)?;
        if changed > 0 {
            self.scope.mark_dirty(Table::UserProfiles);
        }
        debug!(
            "event=profile_delete module=store status=ok user_id={} changed={}",
            id, changed
        );
        Ok(changed)
    }

    pub fn delete_profile_with_records(&self, user_id: UserId) -> RepoResult<usize> {
        let records = self.delete_records_by_user(user_id)?;
        let profiles = self.delete_profile(user_id)?;
        Ok(records + profiles)
    }

    pub fn delete_record(&self, id: RecordId) -> RepoResult<usize> {
        let changed = SqliteRecordRepository::new(self.scope.conn()).delete_record(id)?;
        if changed > 0 {
            self.scope.mark_dirty(Table::HealthRecords);
        }
        Ok(changed)
    }

    pub fn delete_records_by_user(&self, user_id: UserId) -> RepoResult<usize> {
        let changed =
            SqliteRecordRepository::new(self.scope.conn()).delete_records_by_user(user_id)?;
        if changed > 0 {
            self.scope.mark_dirty(Table::HealthRecords);
        }
        Ok(changed)
    }

    /// Clears every table inside this transaction without reclaiming space.
    pub fn clear_all(&self) -> RepoResult<()> {
        self.scope.clear_all_tables()?;
        Ok(())
    }
}
