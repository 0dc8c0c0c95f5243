//! Combining repeated vitals readings into one stored record.
//!
//! # Responsibility
//! - Reduce a measuring session (several cuff readings in a row) to one
//!   set of vitals using a caller-chosen method.
//!
//! # Invariants
//! - Each component is combined independently; readings missing a component
//!   do not contribute to it.
//! - A component absent from every contributing reading stays `None`.
//! - Integer results truncate toward zero.

use crate::model::health_record::HealthRecord;
use crate::model::UserId;
use serde::{Deserialize, Serialize};

/// One raw measurement taken during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub weight: Option<f64>,
}

impl Reading {
    pub fn blood_pressure(systolic: i32, diastolic: i32, heart_rate: i32) -> Self {
        Self {
            systolic: Some(systolic),
            diastolic: Some(diastolic),
            heart_rate: Some(heart_rate),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Builds an unsaved record carrying these vitals.
    pub fn into_record(self, user_id: UserId, date: impl Into<String>) -> HealthRecord {
        let mut record = HealthRecord::new(user_id, date);
        record.systolic = self.systolic;
        record.diastolic = self.diastolic;
        record.heart_rate = self.heart_rate;
        record.weight = self.weight;
        record
    }
}

/// How a session's readings are reduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingMethod {
    /// Per-component median; drops the extremes of three readings.
    Median,
    /// Mean of every reading.
    Average,
    /// Drops the first reading and averages the rest. With fewer than two
    /// readings this is [`ReadingMethod::Average`].
    DiscardFirst,
    /// One reading is kept, of two the second is kept, of three or more the
    /// second and third are averaged.
    #[default]
    SecondAndThird,
}

/// Reduces `readings` with `method`; `None` when there is nothing to reduce.
pub fn combine_readings(readings: &[Reading], method: ReadingMethod) -> Option<Reading> {
    if readings.is_empty() {
        return None;
    }

    let combined = match method {
        ReadingMethod::Median => reduce(readings, median_i32, median_f64),
        ReadingMethod::Average => reduce(readings, mean_i32, mean_f64),
        ReadingMethod::DiscardFirst if readings.len() < 2 => reduce(readings, mean_i32, mean_f64),
        ReadingMethod::DiscardFirst => reduce(&readings[1..], mean_i32, mean_f64),
        ReadingMethod::SecondAndThird => match readings {
            [only] => *only,
            [_, second] => *second,
            [_, second, third, ..] => reduce(&[*second, *third], mean_i32, mean_f64),
            [] => return None,
        },
    };
    Some(combined)
}

fn reduce(
    readings: &[Reading],
    ints: fn(Vec<i32>) -> Option<i32>,
    floats: fn(Vec<f64>) -> Option<f64>,
) -> Reading {
    let collect_int = |pick: fn(&Reading) -> Option<i32>| {
        ints(readings.iter().filter_map(pick).collect())
    };
    Reading {
        systolic: collect_int(|reading| reading.systolic),
        diastolic: collect_int(|reading| reading.diastolic),
        heart_rate: collect_int(|reading| reading.heart_rate),
        weight: floats(readings.iter().filter_map(|reading| reading.weight).collect()),
    }
}

fn mean_i32(values: Vec<i32>) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().copied().map(i64::from).sum();
    i32::try_from(sum / values.len() as i64).ok()
}

fn mean_f64(values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median_i32(mut values: Vec<i32>) -> Option<i32> {
    values.sort_unstable();
    let mid = values.len() / 2;
    match values.len() {
        0 => None,
        len if len % 2 == 1 => Some(values[mid]),
        _ => i32::try_from((i64::from(values[mid - 1]) + i64::from(values[mid])) / 2).ok(),
    }
}

fn median_f64(mut values: Vec<f64>) -> Option<f64> {
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    match values.len() {
        0 => None,
        len if len % 2 == 1 => Some(values[mid]),
        _ => Some((values[mid - 1] + values[mid]) / 2.0),
    }
}
