//! Shared validation errors and field checks for domain records.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static CALENDAR_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid calendar date regex")
});
static RECORD_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}(?:[ T][0-9]{2}:[0-9]{2}(?::[0-9]{2})?)?$")
        .expect("valid record date regex")
});

/// Field-level invariant violation detected before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Identity columns must not be negative.
    NegativeId { field: &'static str, value: i64 },
    /// Date text does not match the expected `YYYY-MM-DD` shape.
    InvalidDate { field: &'static str, value: String },
    /// Required text column is empty or whitespace only.
    BlankField(&'static str),
    /// Integer field outside its allowed closed range.
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    /// Measurement is negative, NaN or infinite.
    InvalidMeasurement { field: &'static str, value: f64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeId { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
            Self::InvalidDate { field, value } => {
                write!(f, "{field} is not a valid date: `{value}`")
            }
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} must be within {min}..={max}, got {value}"),
            Self::InvalidMeasurement { field, value } => {
                write!(f, "{field} must be a finite non-negative number, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn check_id(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeId { field, value });
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD` with an optional `HH:MM[:SS]` suffix.
pub(crate) fn check_record_date(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if RECORD_DATE_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
    }
}

/// Accepts `YYYY-MM-DD` only.
pub(crate) fn check_calendar_date(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if CALENDAR_DATE_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
    }
}

pub(crate) fn check_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn check_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn check_measurement(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidMeasurement { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_calendar_date, check_record_date, ValidationError};

    #[test]
    fn record_date_accepts_optional_time_suffix() {
        assert!(check_record_date("date", "2024-03-01").is_ok());
        assert!(check_record_date("date", "2024-03-01 08:30").is_ok());
        assert!(check_record_date("date", "2024-03-01T08:30:15").is_ok());
        assert!(check_record_date("date", "03/01/2024").is_err());
    }

    #[test]
    fn dates_accept_ascii_digits_only() {
        assert!(check_calendar_date("date", "٢٠٢٤-٠١-٠١").is_err());
        assert!(check_record_date("date", "２０２４-０３-０１").is_err());
        assert!(check_record_date("date", "2024-03-01 ０８:３０").is_err());
        assert!(check_calendar_date("date", "2024-01-01").is_ok());
    }

    #[test]
    fn calendar_date_rejects_time_suffix() {
        let err = check_calendar_date("date", "2024-03-01 08:30").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDate {
                field: "date",
                value: "2024-03-01 08:30".to_string()
            }
        );
    }
}
