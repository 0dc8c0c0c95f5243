//! Health measurement record.
//!
//! # Responsibility
//! - Carry one dated set of vitals for one user.
//! - Validate field invariants before the record reaches SQL.
//!
//! # Invariants
//! - `id == NEW_RECORD_ID` means "assign a fresh identity on insert".
//! - Persisted records always have `id > 0`.
//! - `date` is `YYYY-MM-DD` with an optional time suffix, so lexical order is
//!   chronological order.

use crate::model::validation::{
    check_id, check_measurement, check_range, check_record_date, ValidationError,
};
use crate::model::{RecordId, UserId};
use serde::{Deserialize, Serialize};

/// Identity sentinel requesting auto-assignment on insert.
pub const NEW_RECORD_ID: RecordId = 0;

const MAX_PRESSURE_MMHG: i64 = 400;
const MAX_HEART_RATE_BPM: i64 = 400;

/// One dated measurement entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub date: String,
    /// Systolic blood pressure in mmHg.
    pub systolic: Option<i32>,
    /// Diastolic blood pressure in mmHg.
    pub diastolic: Option<i32>,
    /// Beats per minute.
    pub heart_rate: Option<i32>,
    /// Kilograms.
    pub weight: Option<f64>,
}

impl HealthRecord {
    /// Creates an unsaved record with no measurements.
    pub fn new(user_id: UserId, date: impl Into<String>) -> Self {
        Self {
            id: NEW_RECORD_ID,
            user_id,
            date: date.into(),
            systolic: None,
            diastolic: None,
            heart_rate: None,
            weight: None,
        }
    }

    pub fn with_blood_pressure(mut self, systolic: i32, diastolic: i32) -> Self {
        self.systolic = Some(systolic);
        self.diastolic = Some(diastolic);
        self
    }

    pub fn with_heart_rate(mut self, heart_rate: i32) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Returns whether insert will assign a fresh identity.
    pub fn is_new(&self) -> bool {
        self.id == NEW_RECORD_ID
    }

    /// Checks field invariants.
    ///
    /// # Errors
    /// - Negative `id` or `user_id`.
    /// - `date` not in `YYYY-MM-DD[ HH:MM[:SS]]` form.
    /// - Vitals outside plausible bounds, or weight negative / non-finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id("health_record.id", self.id)?;
        check_id("health_record.user_id", self.user_id)?;
        check_record_date("health_record.date", &self.date)?;
        if let Some(value) = self.systolic {
            check_range("health_record.systolic", i64::from(value), 0, MAX_PRESSURE_MMHG)?;
        }
        if let Some(value) = self.diastolic {
            check_range("health_record.diastolic", i64::from(value), 0, MAX_PRESSURE_MMHG)?;
        }
        if let Some(value) = self.heart_rate {
            check_range("health_record.heart_rate", i64::from(value), 0, MAX_HEART_RATE_BPM)?;
        }
        if let Some(value) = self.weight {
            check_measurement("health_record.weight", value)?;
        }
        Ok(())
    }
}
