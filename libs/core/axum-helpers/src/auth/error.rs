use crate::errors::AppError;
use thiserror::Error;

/// Failures while issuing or checking bearer tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Token not found")]
    NotWhitelisted,

    #[error("Token subject is not a valid user id")]
    InvalidSubject,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token store error: {0}")]
    Store(String),
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Store(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(msg) => {
                tracing::error!("Token store unavailable: {}", msg);
                AppError::ServiceUnavailable("Service temporarily unavailable".to_string())
            }
            AuthError::Signing(msg) => AppError::InternalServerError(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}
