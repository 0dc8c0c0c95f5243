//! Expected table layout, schema fingerprint and live-schema validation.
//!
//! # Responsibility
//! - Declare the column set of every store table in one place.
//! - Derive the schema identity token from that declaration.
//! - Compare the live SQLite schema against the declaration.
//!
//! # Invariants
//! - `TABLE_SPECS` and the newest migration must describe the same layout.
//! - The identity token changes whenever any declared column changes.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Table that stores the schema identity token.
pub const SCHEMA_META_TABLE: &str = "schema_meta";
const SCHEMA_META_ROW_ID: i64 = 1;

/// Store tables observable by live queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    HealthRecords,
    UserProfiles,
    AlmanacData,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::HealthRecords, Table::UserProfiles, Table::AlmanacData];

    pub fn name(self) -> &'static str {
        match self {
            Self::HealthRecords => "health_records",
            Self::UserProfiles => "user_profiles",
            Self::AlmanacData => "almanac_data",
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected column attributes as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub not_null: bool,
    /// 1-based position inside the primary key, `0` when not part of it.
    pub primary_key_position: u32,
}

/// Expected layout of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub table: Table,
    pub columns: &'static [ColumnSpec],
}

const fn column(
    name: &'static str,
    sql_type: &'static str,
    not_null: bool,
    primary_key_position: u32,
) -> ColumnSpec {
    ColumnSpec {
        name,
        sql_type,
        not_null,
        primary_key_position,
    }
}

pub const TABLE_SPECS: &[TableSpec] = &[
    TableSpec {
        table: Table::HealthRecords,
        columns: &[
            column("id", "INTEGER", true, 1),
            column("user_id", "INTEGER", true, 0),
            column("date", "TEXT", true, 0),
            column("systolic", "INTEGER", false, 0),
            column("diastolic", "INTEGER", false, 0),
            column("heart_rate", "INTEGER", false, 0),
            column("weight", "REAL", false, 0),
        ],
    },
    TableSpec {
        table: Table::UserProfiles,
        columns: &[
            column("id", "INTEGER", true, 1),
            column("name", "TEXT", true, 0),
            column("birth_year", "INTEGER", true, 0),
            column("birth_month", "INTEGER", true, 0),
            column("birth_day", "INTEGER", true, 0),
            column("height", "REAL", true, 0),
            column("language", "TEXT", true, 0),
            column("insight_language", "TEXT", true, 0),
        ],
    },
    TableSpec {
        table: Table::AlmanacData,
        columns: &[
            column("date", "TEXT", true, 1),
            column("yi", "TEXT", true, 0),
            column("ji", "TEXT", true, 0),
            column("lunar_date", "TEXT", true, 0),
        ],
    },
];

/// Returns the schema identity token for `TABLE_SPECS`.
///
/// Lowercase hex XxHash64 over a canonical text rendering of every table.
pub fn identity_hash() -> String {
    let mut canonical = String::new();
    for spec in TABLE_SPECS {
        canonical.push_str(spec.table.name());
        canonical.push('(');
        canonical.push_str(&describe_columns(spec.columns.iter().copied().map(OwnedColumn::from)));
        canonical.push_str(")\n");
    }

    let mut hasher = XxHash64::with_seed(0);
    hasher.write(canonical.as_bytes());
    format!("{:016x}", hasher.finish())
}

/// Reads the stored identity token, `None` when absent.
pub fn stored_identity_hash(conn: &Connection) -> DbResult<Option<String>> {
    if !table_exists(conn, SCHEMA_META_TABLE)? {
        return Ok(None);
    }
    let hash = conn
        .query_row(
            "SELECT identity_hash FROM schema_meta WHERE id = ?1;",
            [SCHEMA_META_ROW_ID],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(hash)
}

/// Writes the compiled identity token into `schema_meta`.
pub(crate) fn write_identity_hash(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta (id, identity_hash) VALUES (?1, ?2);",
        rusqlite::params![SCHEMA_META_ROW_ID, identity_hash()],
    )?;
    Ok(())
}

/// Validates every declared table and the stored identity token.
///
/// # Errors
/// - `SchemaMismatch` on the first table whose columns differ.
/// - `IdentityMismatch` when the stored token is missing or different.
pub fn validate_schema(conn: &Connection) -> DbResult<()> {
    for spec in TABLE_SPECS {
        validate_table(conn, spec)?;
    }

    let expected = identity_hash();
    let found = stored_identity_hash(conn)?;
    if found.as_deref() != Some(expected.as_str()) {
        return Err(DbError::IdentityMismatch { expected, found });
    }
    Ok(())
}

/// Validates only the declared tables already present in the file.
///
/// Run before the first migration so that `CREATE TABLE IF NOT EXISTS`
/// cannot silently adopt a table with a foreign layout.
pub(crate) fn validate_existing_tables(conn: &Connection) -> DbResult<()> {
    for spec in TABLE_SPECS {
        if table_exists(conn, spec.table.name())? {
            validate_table(conn, spec)?;
        }
    }
    Ok(())
}

/// Drops every store table and the identity table.
pub(crate) fn drop_all_tables(conn: &Connection) -> DbResult<()> {
    for table in Table::ALL {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", table.name()))?;
    }
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {SCHEMA_META_TABLE};"))?;
    Ok(())
}

/// Deletes every row from every store table.
pub(crate) fn delete_all_rows(conn: &Connection) -> DbResult<()> {
    for table in Table::ALL {
        conn.execute(&format!("DELETE FROM {};", table.name()), [])?;
    }
    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OwnedColumn {
    name: String,
    sql_type: String,
    not_null: bool,
    primary_key_position: u32,
}

impl From<ColumnSpec> for OwnedColumn {
    fn from(value: ColumnSpec) -> Self {
        Self {
            name: value.name.to_string(),
            sql_type: value.sql_type.to_string(),
            not_null: value.not_null,
            primary_key_position: value.primary_key_position,
        }
    }
}

fn validate_table(conn: &Connection, spec: &TableSpec) -> DbResult<()> {
    let expected_columns = spec
        .columns
        .iter()
        .copied()
        .map(OwnedColumn::from)
        .collect::<Vec<_>>();
    let live_columns = load_live_columns(conn, spec.table.name())?;

    let expected_by_name = index_by_name(&expected_columns);
    let live_by_name = index_by_name(&live_columns);
    if expected_by_name == live_by_name {
        return Ok(());
    }

    let found = if live_columns.is_empty() {
        "<missing table>".to_string()
    } else {
        format!("({})", describe_columns(live_columns.into_iter()))
    };
    Err(DbError::SchemaMismatch {
        table: spec.table.name(),
        expected: format!("({})", describe_columns(expected_columns.into_iter())),
        found,
    })
}

fn index_by_name(columns: &[OwnedColumn]) -> BTreeMap<&str, (String, bool, u32)> {
    columns
        .iter()
        .map(|column| {
            (
                column.name.as_str(),
                (
                    column.sql_type.to_ascii_uppercase(),
                    column.not_null,
                    column.primary_key_position,
                ),
            )
        })
        .collect()
}

fn load_live_columns(conn: &Connection, table: &str) -> DbResult<Vec<OwnedColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let not_null: i64 = row.get("notnull")?;
        let primary_key_position: i64 = row.get("pk")?;
        columns.push(OwnedColumn {
            name: row.get("name")?,
            sql_type: row.get("type")?,
            not_null: not_null != 0,
            primary_key_position: u32::try_from(primary_key_position).unwrap_or(0),
        });
    }
    Ok(columns)
}

fn describe_columns(columns: impl Iterator<Item = OwnedColumn>) -> String {
    columns
        .map(|column| {
            let mut text = format!("{} {}", column.name, column.sql_type.to_ascii_uppercase());
            if column.not_null {
                text.push_str(" NOT NULL");
            }
            if column.primary_key_position > 0 {
                text.push_str(&format!(" PK{}", column.primary_key_position));
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{identity_hash, Table};

    #[test]
    fn identity_hash_is_stable_lowercase_hex() {
        let first = identity_hash();
        assert_eq!(first, identity_hash());
        assert_eq!(first.len(), 16);
        assert!(first
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch)));
    }

    #[test]
    fn table_names_match_sql_names() {
        let names = Table::ALL.map(Table::name);
        assert_eq!(names, ["health_records", "user_profiles", "almanac_data"]);
    }
}
