//! Named predicates for the patient and visit contracts.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("date").with_message("must be a valid date".into())),
    }
}

/// Birth dates are valid dates no later than today.
pub fn validate_birth_date(value: &str) -> Result<(), ValidationError> {
    validate_date(value)?;
    match parse_date(value) {
        Some(date) if date > Utc::now().date_naive() => Err(ValidationError::new("before_or_equal")
            .with_message("must not be in the future".into())),
        _ => Ok(()),
    }
}

pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    match Uuid::parse_str(value) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("uuid").with_message("must be a valid UUID".into())),
    }
}

/// Field error reported when a referenced record does not exist.
pub fn exists_error(field: &'static str, value: Uuid) -> ValidationErrors {
    let mut error = ValidationError::new("exists")
        .with_message(format!("the selected {} is invalid", field).into());
    error.add_param("value".into(), &value.to_string());

    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

/// Unwrap a field that the contract marks `required`.
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationErrors> {
    value.ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new("required").with_message(format!("{} is required", field).into()),
        );
        errors
    })
}

/// Parse a field already checked by `validate_date`.
pub fn date_field(value: &str, field: &'static str) -> Result<NaiveDate, ValidationErrors> {
    parse_date(value).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new("date").with_message("must be a valid date".into()),
        );
        errors
    })
}

/// Parse a field already checked by `validate_uuid`.
pub fn uuid_field(value: &str, field: &'static str) -> Result<Uuid, ValidationErrors> {
    Uuid::parse_str(value.trim()).map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new("uuid").with_message("must be a valid UUID".into()),
        );
        errors
    })
}
