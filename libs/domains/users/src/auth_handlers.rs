use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use axum_helpers::{
    AuditEvent, AuditOutcome, AuthUser, ValidatedJson,
    errors::responses::{
        BadRequestValidationResponse, InternalServerErrorResponse, NotFoundResponse,
        ServiceUnavailableResponse, UnauthorizedResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{LoginRequest, TokenResponse, UserResponse};
use crate::repository::UserRepository;
use crate::service::AuthService;

pub const TAG: &str = "auth";

/// OpenAPI documentation for the session endpoints
#[derive(OpenApi)]
#[openapi(
    paths(login, logout, me),
    components(
        schemas(LoginRequest, TokenResponse),
        responses(
            BadRequestValidationResponse,
            UnauthorizedResponse,
            NotFoundResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Login, logout and current user")
    )
)]
pub struct AuthApiDoc;

/// Create the auth router (`/login`, `/logout`, `/me`)
pub fn auth_router<R: UserRepository + 'static>(service: AuthService<R>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(Arc::new(service))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/login",
    tag = TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> UserResult<Json<TokenResponse>> {
    let email = input.email.trim().to_lowercase();

    match service.login(input).await {
        Ok(token) => {
            AuditEvent::new(
                Some(token.user.id.to_string()),
                "user.login",
                None,
                AuditOutcome::Success,
            )
            .with_request(&headers)
            .log();
            Ok(Json(token))
        }
        Err(UserError::InvalidCredentials) => {
            AuditEvent::new(None, "user.login", None, AuditOutcome::Failure)
                .with_request(&headers)
                .with_details(serde_json::json!({ "email": email }))
                .log();
            Err(UserError::InvalidCredentials)
        }
        Err(err) => Err(err),
    }
}

/// Revoke the current bearer token
#[utoipa::path(
    post,
    path = "/logout",
    tag = TAG,
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, response = UnauthorizedResponse),
        (status = 503, response = ServiceUnavailableResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn logout<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    user: AuthUser,
    headers: HeaderMap,
) -> UserResult<StatusCode> {
    service.logout(user.claims()).await?;

    AuditEvent::new(
        Some(user.claims().sub.clone()),
        "user.logout",
        None,
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/me",
    tag = TAG,
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn me<R: UserRepository>(
    State(service): State<Arc<AuthService<R>>>,
    user: AuthUser,
) -> UserResult<Json<UserResponse>> {
    let current = service.me(user.claims()).await?;
    Ok(Json(current))
}
