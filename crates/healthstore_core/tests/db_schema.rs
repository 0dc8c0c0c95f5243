use healthstore_core::db::migrations::latest_version;
use healthstore_core::db::schema::{identity_hash, stored_identity_hash};
use healthstore_core::db::{open_db, open_db_in_memory, open_db_with, DbCallback, DbConfig, DbError};
use healthstore_core::{HealthRecord, HealthStore};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<&'static str>>,
}

impl Recorder {
    fn take(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl DbCallback for Recorder {
    fn on_create(&self, _conn: &Connection) {
        self.events.lock().unwrap().push("create");
    }

    fn on_open(&self, _conn: &Connection) {
        self.events.lock().unwrap().push("open");
    }

    fn on_destructive_migration(&self, _conn: &Connection) {
        self.events.lock().unwrap().push("destructive_migration");
    }
}

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "health_records");
    assert_table_exists(&conn, "user_profiles");
    assert_table_exists(&conn, "almanac_data");
    assert_eq!(
        stored_identity_hash(&conn).unwrap().as_deref(),
        Some(identity_hash().as_str())
    );
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("health.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "health_records");
}

#[test]
fn file_database_uses_wal_journal() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.db")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn tampered_identity_token_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.db");

    let conn = open_db(&path).unwrap();
    conn.execute("UPDATE schema_meta SET identity_hash = 'bogus';", [])
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::IdentityMismatch { expected, found } => {
            assert_eq!(expected, identity_hash());
            assert_eq!(found.as_deref(), Some("bogus"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn drifted_table_layout_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drift.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch("ALTER TABLE health_records ADD COLUMN note TEXT;")
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(err.is_schema_drift());
    match err {
        DbError::SchemaMismatch { table, found, .. } => {
            assert_eq!(table, "health_records");
            assert!(found.contains("note"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_table_is_reported_as_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch("DROP TABLE almanac_data;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaMismatch { table, .. } => assert_eq!(table, "almanac_data"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unversioned_file_with_foreign_table_is_reported_as_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    create_legacy_records_table(&path);

    let err = open_db(&path).unwrap_err();
    assert!(err.is_schema_drift());
    match err {
        DbError::SchemaMismatch { table, found, .. } => {
            assert_eq!(table, "health_records");
            assert!(found.contains("userId"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
}

#[test]
fn destructive_fallback_replaces_foreign_table_in_unversioned_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy_fallback.db");
    create_legacy_records_table(&path);

    let recorder = Arc::new(Recorder::default());
    let config = DbConfig::new()
        .fallback_to_destructive_migration(true)
        .add_callback(recorder.clone());
    let store = HealthStore::open(&path, &config).unwrap();

    assert_eq!(recorder.take(), vec!["destructive_migration", "open"]);
    assert!(store.load_records_by_user(1).unwrap().is_empty());
    let id = store
        .insert_record(&HealthRecord::new(1, "2024-05-01").with_blood_pressure(118, 76))
        .unwrap();
    assert_eq!(store.load_records_by_user(1).unwrap()[0].id, id);
}

#[test]
fn unversioned_file_with_matching_tables_is_adopted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adopt.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE almanac_data (
            date TEXT PRIMARY KEY NOT NULL,
            yi TEXT NOT NULL,
            ji TEXT NOT NULL,
            lunar_date TEXT NOT NULL
        );
        INSERT INTO almanac_data VALUES ('2024-02-10', 'a', 'b', 'c');",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let kept: i64 = conn
        .query_row("SELECT COUNT(*) FROM almanac_data;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(kept, 1);
}

#[test]
fn callbacks_fire_on_create_and_every_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("callbacks.db");
    let recorder = Arc::new(Recorder::default());
    let config = DbConfig::new().add_callback(recorder.clone());

    drop(open_db_with(&path, &config).unwrap());
    assert_eq!(recorder.take(), vec!["create", "open"]);

    drop(open_db_with(&path, &config).unwrap());
    assert_eq!(recorder.take(), vec!["open"]);
}

#[test]
fn destructive_fallback_recreates_drifted_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fallback.db");

    {
        let store = HealthStore::open(&path, &DbConfig::new()).unwrap();
        store
            .insert_record(&HealthRecord::new(1, "2024-01-01").with_heart_rate(70))
            .unwrap();
    }
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("ALTER TABLE user_profiles ADD COLUMN avatar TEXT;")
        .unwrap();
    drop(conn);

    let recorder = Arc::new(Recorder::default());
    let config = DbConfig::new()
        .fallback_to_destructive_migration(true)
        .add_callback(recorder.clone());
    let store = HealthStore::open(&path, &config).unwrap();

    assert_eq!(recorder.take(), vec!["destructive_migration", "open"]);
    assert!(store.load_records_by_user(1).unwrap().is_empty());
    store
        .database()
        .read(|conn| {
            assert_eq!(schema_version(conn), latest_version());
            Ok::<_, DbError>(())
        })
        .unwrap();
}

#[test]
fn destructive_fallback_handles_newer_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future_fallback.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    let config = DbConfig::new().fallback_to_destructive_migration(true);
    let conn = open_db_with(&path, &config).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "user_profiles");
}

#[test]
fn non_drift_errors_are_not_repaired() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_database = dir.path().join("garbage.db");
    std::fs::write(&not_a_database, vec![0x5a_u8; 4096]).unwrap();

    let config = DbConfig::new().fallback_to_destructive_migration(true);
    let err = open_db_with(&not_a_database, &config).unwrap_err();
    assert!(!err.is_schema_drift());
}

fn create_legacy_records_table(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE health_records (
            id INTEGER PRIMARY KEY,
            userId INTEGER,
            date TEXT,
            sbp INTEGER,
            dbp INTEGER,
            hr INTEGER,
            weight REAL
        );
        INSERT INTO health_records (userId, date, sbp) VALUES (1, '2024-01-01', 120);",
    )
    .unwrap();
    assert_eq!(schema_version(&conn), 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
