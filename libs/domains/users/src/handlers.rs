use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    AuditEvent, AuditOutcome, AuthUser, ValidatedJson,
    errors::responses::{
        BadRequestValidationResponse, ConflictResponse, ForbiddenResponse,
        InternalServerErrorResponse, UnauthorizedResponse,
    },
};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::UserResult;
use crate::models::{CreateUser, Role, UserFilter, UserPage, UserResponse};
use crate::repository::UserRepository;
use crate::service::UserService;

pub const TAG: &str = "admin";

/// OpenAPI documentation for staff user administration
#[derive(OpenApi)]
#[openapi(
    paths(list_users, create_user),
    components(
        schemas(UserResponse, UserPage, CreateUser, UserFilter, Role),
        responses(
            BadRequestValidationResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Staff user administration")
    )
)]
pub struct ApiDoc;

/// Create the admin users router
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .with_state(Arc::new(service))
}

/// List staff users
#[utoipa::path(
    get,
    path = "/users",
    tag = TAG,
    params(UserFilter),
    responses(
        (status = 200, description = "Users ordered by email", body = UserPage),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Query(filter): Query<UserFilter>,
) -> UserResult<Json<UserPage>> {
    let page = service.list_users(filter).await?;
    Ok(Json(page))
}

/// Create a staff user
///
/// Abilities default to those of the given roles.
#[utoipa::path(
    post,
    path = "/users",
    tag = TAG,
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    admin: AuthUser,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;

    AuditEvent::new(
        Some(admin.claims().sub.clone()),
        "user.create",
        Some(format!("user:{}", user.id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .with_details(json!({ "roles": user.roles }))
    .log();

    Ok((StatusCode::CREATED, Json(user)))
}
