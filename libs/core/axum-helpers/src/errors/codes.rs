//! Error identifiers carried in every [`ErrorResponse`](super::ErrorResponse).
//!
//! Numeric ranges: 1xxx request and access, 2xxx storage, 3xxx migrations,
//! 5xxx serialization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Shape or referential rule failed; `details` lists the fields
    ValidationError,
    InvalidUuid,
    /// Body missing, not JSON, or wrong content type
    JsonExtraction,
    NotFound,
    InternalError,
    Unauthorized,
    Forbidden,
    /// e.g. duplicate email, insufficient stock, restoring a live patient
    Conflict,
    /// e.g. checking out an empty cart
    UnprocessableEntity,
    /// Integer path id that does not parse
    InvalidId,
    ServiceUnavailable,
    DatabaseNotFound,
    DatabaseConnection,
    DatabaseError,
    DatabaseUnhandled,
    MigrationError,
    SerdeJsonError,
}

struct Meta {
    ident: &'static str,
    number: i32,
    message: &'static str,
}

const fn meta(ident: &'static str, number: i32, message: &'static str) -> Meta {
    Meta { ident, number, message }
}

impl ErrorCode {
    const fn meta(self) -> Meta {
        match self {
            Self::ValidationError => meta("VALIDATION_ERROR", 1001, "Request validation failed"),
            Self::InvalidUuid => meta("INVALID_UUID", 1002, "Invalid UUID format"),
            Self::JsonExtraction => meta("JSON_EXTRACTION", 1003, "Failed to parse request body"),
            Self::NotFound => meta("NOT_FOUND", 1004, "Resource not found"),
            Self::InternalError => meta("INTERNAL_ERROR", 1005, "An internal server error occurred"),
            Self::Unauthorized => meta("UNAUTHORIZED", 1006, "Authentication required"),
            Self::Forbidden => meta("FORBIDDEN", 1007, "Access forbidden"),
            Self::Conflict => meta("CONFLICT", 1008, "Request conflicts with current state"),
            Self::UnprocessableEntity => meta("UNPROCESSABLE_ENTITY", 1009, "Request cannot be processed"),
            Self::InvalidId => meta("INVALID_ID", 1010, "Invalid identifier"),
            Self::ServiceUnavailable => meta("SERVICE_UNAVAILABLE", 1011, "Service is temporarily unavailable"),
            Self::DatabaseNotFound => meta("DATABASE_NOT_FOUND", 2001, "Database record not found"),
            Self::DatabaseConnection => meta("DATABASE_CONNECTION", 2002, "Database connection unavailable"),
            Self::DatabaseError => meta("DATABASE_ERROR", 2003, "Database error occurred"),
            Self::DatabaseUnhandled => meta("DATABASE_UNHANDLED", 2099, "Unhandled database error"),
            Self::MigrationError => meta("MIGRATION_ERROR", 3001, "Migration error"),
            Self::SerdeJsonError => meta("SERDE_JSON_ERROR", 5001, "JSON serialization error"),
        }
    }

    /// Identifier clients match on; the same string serde produces.
    pub fn as_str(&self) -> &'static str {
        self.meta().ident
    }

    /// Number logged as `error_code`.
    pub fn code(&self) -> i32 {
        self.meta().number
    }

    /// Message used when the error carries none of its own.
    pub fn default_message(&self) -> &'static str {
        self.meta().message
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
