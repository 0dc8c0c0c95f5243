//! User profile record.

use crate::model::validation::{
    check_id, check_measurement, check_not_blank, check_range, ValidationError,
};
use crate::model::UserId;
use serde::{Deserialize, Serialize};

/// Per-user settings and body data.
///
/// Identity is chosen by the caller; inserting a profile with an existing `id`
/// replaces the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub birth_year: i32,
    pub birth_month: i32,
    pub birth_day: i32,
    /// Centimeters.
    pub height: f64,
    /// UI language code.
    pub language: String,
    /// Language used for generated health insights, independent of the UI.
    pub insight_language: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: 1,
            name: "Me".to_string(),
            birth_year: 1990,
            birth_month: 1,
            birth_day: 1,
            height: 175.0,
            language: "zh".to_string(),
            insight_language: "zh".to_string(),
        }
    }
}

impl UserProfile {
    /// Creates a profile with default body data and languages.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks field invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id("user_profile.id", self.id)?;
        check_not_blank("user_profile.name", &self.name)?;
        check_range("user_profile.birth_month", i64::from(self.birth_month), 1, 12)?;
        check_range("user_profile.birth_day", i64::from(self.birth_day), 1, 31)?;
        check_measurement("user_profile.height", self.height)?;
        if self.height == 0.0 {
            return Err(ValidationError::InvalidMeasurement {
                field: "user_profile.height",
                value: self.height,
            });
        }
        check_not_blank("user_profile.language", &self.language)?;
        check_not_blank("user_profile.insight_language", &self.insight_language)?;
        Ok(())
    }
}
