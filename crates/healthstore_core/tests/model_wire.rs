use healthstore_core::{AlmanacEntry, HealthRecord, UserProfile, ValidationError};
use serde_json::json;

#[test]
fn health_record_new_is_unsaved_and_empty() {
    let record = HealthRecord::new(7, "2024-03-01");

    assert!(record.is_new());
    assert_eq!(record.user_id, 7);
    assert_eq!(record.systolic, None);
    assert_eq!(record.diastolic, None);
    assert_eq!(record.heart_rate, None);
    assert_eq!(record.weight, None);
    assert!(record.validate().is_ok());
}

#[test]
fn health_record_serialization_uses_expected_wire_fields() {
    let record = HealthRecord::new(1, "2024-03-01 08:00")
        .with_blood_pressure(120, 80)
        .with_weight(70.5);

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(
        value,
        json!({
            "id": 0,
            "user_id": 1,
            "date": "2024-03-01 08:00",
            "systolic": 120,
            "diastolic": 80,
            "heart_rate": null,
            "weight": 70.5
        })
    );

    let decoded: HealthRecord = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn user_profile_default_matches_first_run_profile() {
    let value = serde_json::to_value(UserProfile::default()).unwrap();

    assert_eq!(
        value,
        json!({
            "id": 1,
            "name": "Me",
            "birth_year": 1990,
            "birth_month": 1,
            "birth_day": 1,
            "height": 175.0,
            "language": "zh",
            "insight_language": "zh"
        })
    );
}

#[test]
fn almanac_entry_decodes_from_wire_json() {
    let entry: AlmanacEntry = serde_json::from_value(json!({
        "date": "2024-02-10",
        "yi": "祭祀",
        "ji": "动土",
        "lunar_date": "正月初一"
    }))
    .unwrap();

    assert_eq!(entry, AlmanacEntry::new("2024-02-10", "祭祀", "动土", "正月初一"));
    assert!(entry.validate().is_ok());
}

#[test]
fn validation_errors_name_the_field() {
    let mut record = HealthRecord::new(1, "2024-01-01");
    record.heart_rate = Some(900);

    let err = record.validate().unwrap_err();
    assert_eq!(
        err,
        ValidationError::OutOfRange {
            field: "health_record.heart_rate",
            value: 900,
            min: 0,
            max: 400,
        }
    );
    assert!(err.to_string().contains("health_record.heart_rate"));
}
