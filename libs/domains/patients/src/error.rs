use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Visit not found: {0}")]
    VisitNotFound(Uuid),

    #[error("Patient {0} is not deleted")]
    NotDeleted(Uuid),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PatientResult<T> = Result<T, PatientError>;

impl From<sea_orm::DbErr> for PatientError {
    fn from(err: sea_orm::DbErr) -> Self {
        PatientError::Internal(format!("Database error: {}", err))
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::PatientNotFound(id) => {
                AppError::NotFound(format!("Patient {} not found", id))
            }
            PatientError::VisitNotFound(id) => AppError::NotFound(format!("Visit {} not found", id)),
            err @ PatientError::NotDeleted(_) => AppError::Conflict(err.to_string()),
            PatientError::Validation(errors) => AppError::ValidationError(errors),
            PatientError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for PatientError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let status = |err: PatientError| err.into_response().status();

        assert_eq!(status(PatientError::PatientNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status(PatientError::VisitNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status(PatientError::NotDeleted(Uuid::nil())), StatusCode::CONFLICT);
        assert_eq!(
            status(PatientError::Validation(ValidationErrors::new())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PatientError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
