use healthstore_core::{
    AlmanacEntry, DbConfig, HealthRecord, HealthStore, QueryView, RepoError, RepoResult,
    UserProfile,
};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn store() -> HealthStore {
    HealthStore::open_in_memory(&DbConfig::new()).unwrap()
}

fn next<T>(view: &QueryView<T>) -> T {
    view.recv_timeout(WAIT)
        .expect("live query should emit within timeout")
        .expect("live query should succeed")
}

#[test]
fn profile_view_emits_initial_snapshot_then_changes() {
    let store = store();
    let view = store.all_profiles();
    assert!(next(&view).is_empty());

    let profile = UserProfile::new(1, "Me");
    store.insert_profile(&profile).unwrap();
    assert_eq!(next(&view), vec![profile]);

    store.delete_profile(1).unwrap();
    assert!(next(&view).is_empty());
}

#[test]
fn record_view_ignores_unrelated_tables() {
    let store = store();
    let view = store.records_by_user(1);
    assert!(next(&view).is_empty());

    store.insert_profile(&UserProfile::new(1, "Me")).unwrap();
    store
        .insert_almanac(&AlmanacEntry::new("2024-01-01", "a", "b", "c"))
        .unwrap();
    store.insert_record(&HealthRecord::new(1, "2024-01-01")).unwrap();

    // The first emission after subscribe must already carry the record.
    assert_eq!(next(&view).len(), 1);
}

#[test]
fn batch_emits_once_after_commit() {
    let store = store();
    let view = store.records_by_user(1);
    assert!(next(&view).is_empty());

    store
        .batch(|tx| {
            for day in 1..=3 {
                tx.insert_record(&HealthRecord::new(1, format!("2024-01-0{day}")))?;
            }
            Ok(())
        })
        .unwrap();
    store.insert_record(&HealthRecord::new(1, "2024-01-04")).unwrap();

    assert_eq!(next(&view).len(), 3);
    assert_eq!(next(&view).len(), 4);
}

#[test]
fn failed_write_does_not_notify() {
    let store = store();
    let view = store.records_by_user(1);
    assert!(next(&view).is_empty());

    let result: RepoResult<()> = store.batch(|tx| {
        tx.insert_record(&HealthRecord::new(1, "2024-01-01"))?;
        Err(RepoError::InvalidData("abort".to_string()))
    });
    assert!(result.is_err());
    store.insert_record(&HealthRecord::new(1, "2024-01-02")).unwrap();

    let records = next(&view);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, "2024-01-02");
}

#[test]
fn deleting_missing_rows_does_not_notify() {
    let store = store();
    let view = store.all_profiles();
    assert!(next(&view).is_empty());

    assert_eq!(store.delete_profile(42).unwrap(), 0);
    store.insert_profile(&UserProfile::new(7, "G")).unwrap();

    assert_eq!(next(&view).len(), 1);
}

#[test]
fn almanac_view_tracks_one_date() {
    let store = store();
    let view = store.almanac_by_date("2024-02-10");
    assert_eq!(next(&view), None);

    let entry = AlmanacEntry::new("2024-02-10", "出行", "动土", "正月初一");
    store.insert_almanac(&entry).unwrap();
    assert_eq!(next(&view), Some(entry));
}

#[test]
fn cancel_and_drop_unsubscribe() {
    let store = store();
    let tracker = store.database().tracker();

    let first = store.all_profiles();
    let second = store.records_by_user(1);
    assert_eq!(tracker.subscription_count(), 2);

    first.cancel();
    assert_eq!(tracker.subscription_count(), 1);
    drop(second);
    assert_eq!(tracker.subscription_count(), 0);

    store.insert_profile(&UserProfile::new(1, "Me")).unwrap();
}

#[test]
fn views_observe_writes_from_other_threads() {
    let store = store();
    let view = store.records_by_user(9);
    assert!(next(&view).is_empty());

    std::thread::scope(|scope| {
        scope.spawn(|| {
            store
                .insert_record(&HealthRecord::new(9, "2024-06-01"))
                .unwrap();
        });
    });

    assert_eq!(next(&view).len(), 1);
}

#[test]
fn closing_store_ends_views() {
    let store = store();
    let view = store.all_profiles();
    assert!(next(&view).is_empty());

    drop(store);
    assert!(view.recv().is_none());
}

#[test]
fn clear_all_refreshes_every_view() {
    let store = store();
    store.insert_profile(&UserProfile::new(1, "Me")).unwrap();
    store.insert_record(&HealthRecord::new(1, "2024-01-01")).unwrap();

    let profiles = store.all_profiles();
    let records = store.records_by_user(1);
    assert_eq!(next(&profiles).len(), 1);
    assert_eq!(next(&records).len(), 1);

    store.clear_all().unwrap();
    assert!(next(&profiles).is_empty());
    assert!(next(&records).is_empty());
}
