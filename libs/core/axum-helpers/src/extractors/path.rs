//! Single-segment path ids.
//!
//! Patients, visits and cart lines use UUIDs; catalog rows (articles,
//! DCIs, lots, sales) use positive integers. Both reject through
//! [`AppError`] so a bad id gets the standard 400 body.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

async fn segment<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<String, AppError> {
    Path::<String>::from_request_parts(parts, state)
        .await
        .map(|Path(raw)| raw)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// `/patients/{id}`: rejects with `INVALID_UUID`.
#[derive(Debug, Clone, Copy)]
pub struct UuidPath(pub Uuid);

impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = segment(parts, state).await?;
        Ok(UuidPath(Uuid::parse_str(&raw)?))
    }
}

/// `/pharmacy/articles/{id}`: zero, negative and non-numeric values reject
/// with `INVALID_ID`.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw = segment(parts, state).await?;
        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(IdPath(id)),
            _ => Err(AppError::InvalidId(format!("Invalid id: {}", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/lots/{id}", get(|IdPath(id): IdPath| async move { id.to_string() }))
            .route("/patients/{id}", get(|UuidPath(id): UuidPath| async move { id.to_string() }))
    }

    async fn get_path(path: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_valid_ids_pass_through() {
        assert_eq!(get_path("/lots/42").await.0, StatusCode::OK);
        assert_eq!(
            get_path("/patients/0192f0c4-7d35-7000-8000-000000000001").await.0,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_bad_integer_ids() {
        for path in ["/lots/abc", "/lots/0", "/lots/-3"] {
            let (status, body) = get_path(path).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(body["error"], "INVALID_ID", "{path}");
        }
    }

    #[tokio::test]
    async fn test_bad_uuid() {
        let (status, body) = get_path("/patients/42").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_UUID");
    }
}
