//! Health record repository contract and SQLite implementation.
//!
//! # Invariants
//! - Inserts use insert-or-replace; `id == 0` is bound as `NULL` so SQLite
//!   assigns the next row id.
//! - Per-user listings are ordered by `date DESC, id DESC`.

use crate::model::health_record::HealthRecord;
use crate::model::{RecordId, UserId};
use crate::repo::{in_write_scope, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    date,
    systolic,
    diastolic,
    heart_rate,
    weight
FROM health_records";

const RECORD_UPSERT_SQL: &str = "INSERT OR REPLACE INTO health_records (
    id,
    user_id,
    date,
    systolic,
    diastolic,
    heart_rate,
    weight
) VALUES (NULLIF(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7);";

/// Repository interface for health records.
pub trait RecordRepository {
    /// Inserts or replaces one record; returns its row id.
    fn insert_record(&self, record: &HealthRecord) -> RepoResult<RecordId>;
    /// Inserts or replaces all records atomically; returns ids in input order.
    fn insert_all(&self, records: &[HealthRecord]) -> RepoResult<Vec<RecordId>>;
    fn records_by_user(&self, user_id: UserId) -> RepoResult<Vec<HealthRecord>>;
    /// Returns affected row count; `0` when the id does not exist.
    fn delete_record(&self, id: RecordId) -> RepoResult<usize>;
    fn delete_records_by_user(&self, user_id: UserId) -> RepoResult<usize>;
}

/// SQLite-backed health record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn insert_record(&self, record: &HealthRecord) -> RepoResult<RecordId> {
        upsert_record(self.conn, record)
    }

    fn insert_all(&self, records: &[HealthRecord]) -> RepoResult<Vec<RecordId>> {
        in_write_scope(self.conn, |conn| {
            records
                .iter()
                .map(|record| upsert_record(conn, record))
                .collect()
        })
    }

    fn records_by_user(&self, user_id: UserId) -> RepoResult<Vec<HealthRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{RECORD_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY date DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn delete_record(&self, id: RecordId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM health_records WHERE id = ?1;", [id])?;
        Ok(changed)
    }

    fn delete_records_by_user(&self, user_id: UserId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM health_records WHERE user_id = ?1;", [user_id])?;
        Ok(changed)
    }
}

fn upsert_record(conn: &Connection, record: &HealthRecord) -> RepoResult<RecordId> {
    record.validate()?;

    let mut stmt = conn.prepare_cached(RECORD_UPSERT_SQL)?;
    stmt.execute(params![
        record.id,
        record.user_id,
        record.date.as_str(),
        record.systolic,
        record.diastolic,
        record.heart_rate,
        record.weight,
    ])?;

    Ok(conn.last_insert_rowid())
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<HealthRecord> {
    let record = HealthRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date: row.get("date")?,
        systolic: row.get("systolic")?,
        diastolic: row.get("diastolic")?,
        heart_rate: row.get("heart_rate")?,
        weight: row.get("weight")?,
    };
    record.validate().map_err(|err| {
        RepoError::InvalidData(format!("health_records row {}: {err}", record.id))
    })?;
    Ok(record)
}
