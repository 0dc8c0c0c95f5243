//! Almanac repository contract and SQLite implementation.

use crate::model::almanac::AlmanacEntry;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for almanac entries.
pub trait AlmanacRepository {
    /// Inserts an entry or replaces the one stored for the same date.
    fn insert_almanac(&self, entry: &AlmanacEntry) -> RepoResult<()>;
    fn almanac_by_date(&self, date: &str) -> RepoResult<Option<AlmanacEntry>>;
}

/// SQLite-backed almanac repository.
pub struct SqliteAlmanacRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAlmanacRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AlmanacRepository for SqliteAlmanacRepository<'_> {
    fn insert_almanac(&self, entry: &AlmanacEntry) -> RepoResult<()> {
        entry.validate()?;

        self.conn.execute(
            "INSERT OR REPLACE INTO almanac_data (date, yi, ji, lunar_date)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                entry.date.as_str(),
                entry.yi.as_str(),
                entry.ji.as_str(),
                entry.lunar_date.as_str(),
            ],
        )?;
        Ok(())
    }

    fn almanac_by_date(&self, date: &str) -> RepoResult<Option<AlmanacEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, yi, ji, lunar_date
             FROM almanac_data
             WHERE date = ?1
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([date])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_almanac_row(row)?));
        }
        Ok(None)
    }
}

fn parse_almanac_row(row: &Row<'_>) -> RepoResult<AlmanacEntry> {
    let entry = AlmanacEntry {
        date: row.get("date")?,
        yi: row.get("yi")?,
        ji: row.get("ji")?,
        lunar_date: row.get("lunar_date")?,
    };
    entry
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("almanac_data row: {err}")))?;
    Ok(entry)
}
