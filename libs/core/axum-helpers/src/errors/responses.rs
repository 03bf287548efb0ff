//! OpenAPI response components for the shared error body.
//!
//! Handlers list them in `#[utoipa::path(responses(...))]`, e.g.
//! `(status = 409, response = ConflictResponse)`.

use super::ErrorResponse;
use serde_json::json;
use utoipa::ToResponse;

macro_rules! error_response {
    ($(#[$doc:meta])* $name:ident, $description:literal, $code:literal, $error:literal, $message:literal) => {
        $(#[$doc])*
        #[derive(ToResponse)]
        #[response(
            description = $description,
            content_type = "application/json",
            example = json!({ "code": $code, "error": $error, "message": $message })
        )]
        pub struct $name(pub ErrorResponse);
    };
}

error_response!(InternalServerErrorResponse, "Internal Server Error", 1005, "INTERNAL_ERROR", "An internal server error occurred");
error_response!(BadRequestUuidResponse, "Malformed UUID in path", 1002, "INVALID_UUID", "Invalid UUID format");
error_response!(NotFoundResponse, "Resource not found", 1004, "NOT_FOUND", "Patient 0192f0c4-7d35-7000-8000-000000000001 not found");
error_response!(UnauthorizedResponse, "Missing, expired or revoked token", 1006, "UNAUTHORIZED", "Authentication required");
error_response!(ForbiddenResponse, "Authenticated but missing the role or ability", 1007, "FORBIDDEN", "Missing ability pharmacy.sell");
error_response!(ConflictResponse, "Conflicts with current state", 1008, "CONFLICT", "Insufficient stock for article 7");
error_response!(UnprocessableEntityResponse, "Well-formed but not processable now", 1009, "UNPROCESSABLE_ENTITY", "Cart is empty");
error_response!(ServiceUnavailableResponse, "A backing store is down", 1011, "SERVICE_UNAVAILABLE", "Service is temporarily unavailable");

/// Validation failures list every failing field, each with a rule code.
#[derive(ToResponse)]
#[response(
    description = "Validation failed",
    content_type = "application/json",
    example = json!({
        "code": 1001,
        "error": "VALIDATION_ERROR",
        "message": "Request validation failed",
        "details": {
            "quantity": [{ "code": "range", "message": "quantity must be at least 1", "params": { "min": 1.0, "value": 0 } }],
            "article_id": [{ "code": "exists", "message": "article does not exist", "params": { "value": 999 } }]
        }
    })
)]
pub struct BadRequestValidationResponse(pub ErrorResponse);
