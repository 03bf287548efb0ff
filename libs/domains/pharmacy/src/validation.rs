//! Named predicates used by the request contracts, plus helpers for the
//! referential checks the service performs against the store.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
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

pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    match uuid::Uuid::parse_str(value) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("uuid").with_message("must be a valid UUID".into())),
    }
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative").with_message("must be at least 0".into()));
    }
    Ok(())
}

/// Largest amount the `numeric(12,2)` money columns hold.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// A price: non-negative and storable.
pub fn money(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    if *value > MAX_MONEY {
        let mut error = ValidationError::new("range")
            .with_message(format!("must be between 0 and {}", MAX_MONEY).into());
        error.add_param("max".into(), &MAX_MONEY.to_string());
        return Err(error);
    }
    Ok(())
}

/// Field error for a cart quantity whose line would not fit its columns.
pub fn quantity_out_of_range(quantity: i64) -> ValidationErrors {
    let mut error = ValidationError::new("range")
        .with_message("quantity makes the line exceed the maximum amount".into());
    error.add_param("value".into(), &quantity);

    let mut errors = ValidationErrors::new();
    errors.add("quantity", error);
    errors
}

/// Rejects values that are empty once trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("must not be blank".into()));
    }
    Ok(())
}

pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    if *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("range").with_message("must be between 0 and 100".into()));
    }
    Ok(())
}

/// Field error reported when a referenced record does not exist.
pub fn exists_error(field: &'static str, value: i64) -> ValidationErrors {
    let mut error = ValidationError::new("exists")
        .with_message(format!("the selected {} is invalid", field).into());
    error.add_param("value".into(), &value);

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
