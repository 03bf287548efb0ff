use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, AuthError};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        UserError::Internal(format!("Database error: {}", err))
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => AppError::NotFound(format!("User {} not found", id)),
            UserError::DuplicateEmail(email) => {
                AppError::Conflict(format!("User with email '{}' already exists", email))
            }
            UserError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            UserError::Validation(errors) => AppError::ValidationError(errors),
            UserError::Auth(err) => err.into(),
            UserError::PasswordHash(msg) | UserError::Internal(msg) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: UserError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(UserError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(UserError::DuplicateEmail("a@b.c".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(UserError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(UserError::Auth(AuthError::Revoked)), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(UserError::Auth(AuthError::Store("down".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(UserError::PasswordHash("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
