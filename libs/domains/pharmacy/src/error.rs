use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum PharmacyError {
    #[error("Article not found: {0}")]
    ArticleNotFound(i64),

    #[error("Lot not found: {0}")]
    LotNotFound(i64),

    #[error("Cart line not found: {0}")]
    CartLineNotFound(Uuid),

    #[error("Lot {0} has been sold from and cannot be deleted")]
    LotInUse(i64),

    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    #[error("Article with code '{0}' already exists")]
    DuplicateArticleCode(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Sale total exceeds the largest storable amount")]
    AmountTooLarge,

    #[error("Insufficient stock for article {article_id}: requested {requested}, available {available}")]
    InsufficientStock {
        article_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Sale {0} is already invoiced")]
    AlreadyInvoiced(i64),

    #[error("Invoice could not be issued: {0}")]
    Invoice(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PharmacyResult<T> = Result<T, PharmacyError>;

impl From<sea_orm::DbErr> for PharmacyError {
    fn from(err: sea_orm::DbErr) -> Self {
        PharmacyError::Internal(format!("Database error: {}", err))
    }
}

impl From<PharmacyError> for AppError {
    fn from(err: PharmacyError) -> Self {
        match err {
            PharmacyError::ArticleNotFound(id) => {
                AppError::NotFound(format!("Article {} not found", id))
            }
            PharmacyError::LotNotFound(id) => AppError::NotFound(format!("Lot {} not found", id)),
            PharmacyError::CartLineNotFound(id) => {
                AppError::NotFound(format!("Cart line {} not found", id))
            }
            PharmacyError::SaleNotFound(id) => AppError::NotFound(format!("Sale {} not found", id)),
            PharmacyError::Validation(errors) => AppError::ValidationError(errors),
            err @ (PharmacyError::EmptyCart | PharmacyError::AmountTooLarge) => {
                AppError::UnprocessableEntity(err.to_string())
            }
            err @ (PharmacyError::DuplicateArticleCode(_)
            | PharmacyError::InsufficientStock { .. }
            | PharmacyError::LotInUse(_)
            | PharmacyError::AlreadyInvoiced(_)) => AppError::Conflict(err.to_string()),
            PharmacyError::Invoice(msg) | PharmacyError::Internal(msg) => {
                AppError::InternalServerError(msg)
            }
        }
    }
}

impl IntoResponse for PharmacyError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
