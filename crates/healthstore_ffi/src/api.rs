//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose flat, use-case-level store functions to Dart via FRB.
//! - Convert core errors into response envelopes with a readable message.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Every call opens the store at one process-wide path; schema drift is
//!   repaired by destructive recreation.

use healthstore_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AlmanacEntry, DbConfig, HealthRecord, HealthStore, UserProfile,
};
use log::warn;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::OnceLock;

const STORE_DB_FILE_NAME: &str = "healthstore.sqlite3";
static STORE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling log files.
///
/// Returns an empty string on success and the error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// One blood pressure/heart rate/weight entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordItem {
    /// `0` asks the store to assign a new id.
    pub id: i64,
    pub user_id: i64,
    pub date: String,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileItem {
    pub id: i64,
    pub name: String,
    pub birth_year: i32,
    pub birth_month: i32,
    pub birth_day: i32,
    pub height: f64,
    pub language: String,
    pub insight_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlmanacItem {
    pub date: String,
    pub yi: String,
    pub ji: String,
    pub lunar_date: String,
}

/// Result envelope for mutating calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreActionResponse {
    pub ok: bool,
    /// Saved row id, or affected row count for deletes and imports.
    pub value: Option<i64>,
    pub message: String,
}

impl StoreActionResponse {
    fn success(message: impl Into<String>, value: i64) -> Self {
        Self {
            ok: true,
            value: Some(value),
            message: message.into(),
        }
    }

    fn failure(operation: &str, err: impl Display) -> Self {
        warn!("event=ffi_call module=ffi status=error op={}", operation);
        Self {
            ok: false,
            value: None,
            message: format!("{operation} failed: {err}"),
        }
    }
}

/// Result envelope for list/lookup calls; `items` is empty on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreListResponse<T> {
    pub ok: bool,
    pub items: Vec<T>,
    pub message: String,
}

impl<T> StoreListResponse<T> {
    fn from_result<E: Display>(operation: &str, result: Result<Vec<T>, E>) -> Self {
        match result {
            Ok(items) => Self {
                ok: true,
                message: format!("Found {} item(s).", items.len()),
                items,
            },
            Err(err) => {
                warn!("event=ffi_call module=ffi status=error op={}", operation);
                Self {
                    ok: false,
                    items: Vec::new(),
                    message: format!("{operation} failed: {err}"),
                }
            }
        }
    }
}

/// Inserts or replaces a record; returns the stored id.
#[flutter_rust_bridge::frb(sync)]
pub fn record_save(item: RecordItem) -> StoreActionResponse {
    let record = to_record(item);
    match with_store(|store| Ok(store.insert_record(&record)?)) {
        Ok(id) => StoreActionResponse::success("Record saved.", id),
        Err(err) => StoreActionResponse::failure("record_save", err),
    }
}

/// Records of one user, most recent first.
#[flutter_rust_bridge::frb(sync)]
pub fn records_list(user_id: i64) -> StoreListResponse<RecordItem> {
    let result = with_store(|store| Ok(store.load_records_by_user(user_id)?))
        .map(|records| records.into_iter().map(to_record_item).collect());
    StoreListResponse::from_result("records_list", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn record_delete(id: i64) -> StoreActionResponse {
    match with_store(|store| Ok(store.delete_record(id)?)) {
        Ok(count) => StoreActionResponse::success("Record deleted.", count as i64),
        Err(err) => StoreActionResponse::failure("record_delete", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn profile_save(item: ProfileItem) -> StoreActionResponse {
    let profile = to_profile(item);
    match with_store(|store| Ok(store.insert_profile(&profile)?)) {
        Ok(()) => StoreActionResponse::success("Profile saved.", profile.id),
        Err(err) => StoreActionResponse::failure("profile_save", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn profiles_list() -> StoreListResponse<ProfileItem> {
    let result = with_store(|store| Ok(store.load_profiles()?))
        .map(|profiles| profiles.into_iter().map(to_profile_item).collect());
    StoreListResponse::from_result("profiles_list", result)
}

/// Deletes a profile, and its records too when `with_records` is set.
#[flutter_rust_bridge::frb(sync)]
pub fn profile_delete(id: i64, with_records: bool) -> StoreActionResponse {
    let result = with_store(|store| {
        Ok(if with_records {
            store.delete_profile_with_records(id)?
        } else {
            store.delete_profile(id)?
        })
    });
    match result {
        Ok(count) => StoreActionResponse::success("Profile deleted.", count as i64),
        Err(err) => StoreActionResponse::failure("profile_delete", err),
    }
}

/// Id to use for a newly created profile.
#[flutter_rust_bridge::frb(sync)]
pub fn profile_next_id() -> StoreActionResponse {
    match with_store(|store| Ok(store.next_profile_id()?)) {
        Ok(id) => StoreActionResponse::success("Next profile id.", id),
        Err(err) => StoreActionResponse::failure("profile_next_id", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn almanac_save(item: AlmanacItem) -> StoreActionResponse {
    let entry = AlmanacEntry::new(item.date, item.yi, item.ji, item.lunar_date);
    match with_store(|store| Ok(store.insert_almanac(&entry)?)) {
        Ok(()) => StoreActionResponse::success("Almanac saved.", 1),
        Err(err) => StoreActionResponse::failure("almanac_save", err),
    }
}

/// Almanac entry for `date`; `items` holds zero or one entry.
#[flutter_rust_bridge::frb(sync)]
pub fn almanac_get(date: String) -> StoreListResponse<AlmanacItem> {
    let result = with_store(|store| Ok(store.load_almanac(date.trim())?)).map(|entry| {
        entry
            .into_iter()
            .map(|entry| AlmanacItem {
                date: entry.date,
                yi: entry.yi,
                ji: entry.ji,
                lunar_date: entry.lunar_date,
            })
            .collect()
    });
    StoreListResponse::from_result("almanac_get", result)
}

/// CSV export of one user's records; the CSV text is in `message`.
#[flutter_rust_bridge::frb(sync)]
pub fn records_export_csv(user_id: i64) -> StoreActionResponse {
    match with_store(|store| Ok(store.export_records_csv(user_id)?)) {
        Ok(csv) => StoreActionResponse {
            ok: true,
            value: None,
            message: csv,
        },
        Err(err) => StoreActionResponse::failure("records_export_csv", err),
    }
}

/// Imports CSV rows for `user_id`; either every row is stored or none.
#[flutter_rust_bridge::frb(sync)]
pub fn records_import_csv(user_id: i64, csv: String) -> StoreActionResponse {
    match with_store(|store| Ok(store.import_records_csv(user_id, csv.as_bytes())?)) {
        Ok(ids) => StoreActionResponse::success(
            format!("Imported {} record(s).", ids.len()),
            ids.len() as i64,
        ),
        Err(err) => StoreActionResponse::failure("records_import_csv", err),
    }
}

/// Wipes every table of the store.
#[flutter_rust_bridge::frb(sync)]
pub fn store_clear_all() -> StoreActionResponse {
    match with_store(|store| Ok(store.clear_all()?)) {
        Ok(()) => StoreActionResponse::success("Store cleared.", 0),
        Err(err) => StoreActionResponse::failure("store_clear_all", err),
    }
}

fn resolve_store_db_path() -> PathBuf {
    STORE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("HEALTHSTORE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(STORE_DB_FILE_NAME)
        })
        .clone()
}

fn with_store<T>(
    f: impl FnOnce(&HealthStore) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, String> {
    let config = DbConfig::new().fallback_to_destructive_migration(true);
    let store = HealthStore::open(resolve_store_db_path(), &config)
        .map_err(|err| format!("store open failed: {err}"))?;
    f(&store).map_err(|err| err.to_string())
}

fn to_record(item: RecordItem) -> HealthRecord {
    HealthRecord {
        id: item.id,
        user_id: item.user_id,
        date: item.date.trim().to_string(),
        systolic: item.systolic,
        diastolic: item.diastolic,
        heart_rate: item.heart_rate,
        weight: item.weight,
    }
}

fn to_record_item(record: HealthRecord) -> RecordItem {
    RecordItem {
        id: record.id,
        user_id: record.user_id,
        date: record.date,
        systolic: record.systolic,
        diastolic: record.diastolic,
        heart_rate: record.heart_rate,
        weight: record.weight,
    }
}

fn to_profile(item: ProfileItem) -> UserProfile {
    UserProfile {
        id: item.id,
        name: item.name.trim().to_string(),
        birth_year: item.birth_year,
        birth_month: item.birth_month,
        birth_day: item.birth_day,
        height: item.height,
        language: item.language,
        insight_language: item.insight_language,
    }
}

fn to_profile_item(profile: UserProfile) -> ProfileItem {
    ProfileItem {
        id: profile.id,
        name: profile.name,
        birth_year: profile.birth_year,
        birth_month: profile.birth_month,
        birth_day: profile.birth_day,
        height: profile.height,
        language: profile.language,
        insight_language: profile.insight_language,
    }
}
