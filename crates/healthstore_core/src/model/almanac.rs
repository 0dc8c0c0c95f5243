//! Almanac (calendar guidance) entry keyed by date.

use crate::model::validation::{check_calendar_date, ValidationError};
use serde::{Deserialize, Serialize};

/// Calendar guidance for one day. At most one entry exists per `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlmanacEntry {
    /// `YYYY-MM-DD`, primary key.
    pub date: String,
    /// Advisable activities.
    pub yi: String,
    /// Inadvisable activities.
    pub ji: String,
    /// Lunar calendar date label.
    pub lunar_date: String,
}

impl AlmanacEntry {
    pub fn new(
        date: impl Into<String>,
        yi: impl Into<String>,
        ji: impl Into<String>,
        lunar_date: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            yi: yi.into(),
            ji: ji.into(),
            lunar_date: lunar_date.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_calendar_date("almanac.date", &self.date)
    }
}
