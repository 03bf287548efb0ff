//! JSON extractor with automatic validation using the validator crate.

use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Body parse failures reject with `JSON_EXTRACTION` (status taken from the
/// axum rejection), rule failures with `VALIDATION_ERROR` and a field map of
/// `{code, message, params}` entries.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct AddToCart {
///     article_id: i64,
///     #[validate(range(min = 1))]
///     quantity: i32,
/// }
///
/// async fn add(ValidatedJson(input): ValidatedJson<AddToCart>) -> StatusCode {
///     StatusCode::CREATED
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}
