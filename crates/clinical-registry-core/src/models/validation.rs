//! Field validation shared by the codec and interactive entry.

use chrono::NaiveDate;
use thiserror::Error;

/// Calendar date format used everywhere a visit date is read or written.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rejected field values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid age {value:?}: expected a non-negative whole number")]
    InvalidAge { value: String },

    #[error("{field} must not be blank")]
    Blank { field: &'static str },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Parse a visit date in strict `YYYY-MM-DD` form.
///
/// Unpadded months or days, surrounding whitespace and time-of-day suffixes
/// are all rejected rather than coerced.
pub fn parse_visit_date(value: &str) -> ValidationResult<NaiveDate> {
    let invalid = || ValidationError::InvalidDate {
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    if bytes.len() != 10 {
        return Err(invalid());
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

/// Format a visit date for persistence or display.
pub fn format_visit_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse an age. Negative and fractional values are rejected.
pub fn parse_age(value: &str) -> ValidationResult<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidAge {
            value: value.to_string(),
        });
    }
    trimmed.parse().map_err(|_| ValidationError::InvalidAge {
        value: value.to_string(),
    })
}

/// Require a non-blank value.
pub fn require(field: &'static str, value: &str) -> ValidationResult<String> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(value.to_string())
    }
}
