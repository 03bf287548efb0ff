use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{
    UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::PatientResult;
use crate::models::{CreateVisit, UpdateVisit, Visit, VisitFilter, VisitPage, VisitStatus};
use crate::repository::PatientRepository;
use crate::service::VisitService;

pub const TAG: &str = "visites";

/// OpenAPI documentation for the Visits API
#[derive(OpenApi)]
#[openapi(
    paths(list_visits, create_visit, get_visit, update_visit),
    components(
        schemas(Visit, VisitPage, VisitFilter, CreateVisit, UpdateVisit, VisitStatus),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Patient visits")
    )
)]
pub struct VisitApiDoc;

/// Create the visits router (`/visites`)
pub fn visits_router<R: PatientRepository + 'static>(service: VisitService<R>) -> Router {
    Router::new()
        .route("/visites", get(list_visits).post(create_visit))
        .route("/visites/{id}", get(get_visit).patch(update_visit))
        .with_state(Arc::new(service))
}

/// List visits, most recent first
#[utoipa::path(
    get,
    path = "/visites",
    tag = TAG,
    params(VisitFilter),
    responses(
        (status = 200, description = "Visits", body = VisitPage),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_visits<R: PatientRepository>(
    State(service): State<Arc<VisitService<R>>>,
    Query(filter): Query<VisitFilter>,
) -> PatientResult<Json<VisitPage>> {
    let page = service.list_visits(filter).await?;
    Ok(Json(page))
}

/// Schedule or record a visit
#[utoipa::path(
    post,
    path = "/visites",
    tag = TAG,
    request_body = CreateVisit,
    responses(
        (status = 201, description = "Visit created", body = Visit),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_visit<R: PatientRepository>(
    State(service): State<Arc<VisitService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateVisit>,
) -> PatientResult<impl IntoResponse> {
    let visit = service.create_visit(input).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

/// Get a visit
#[utoipa::path(
    get,
    path = "/visites/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Visit ID")
    ),
    responses(
        (status = 200, description = "Visit found", body = Visit),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_visit<R: PatientRepository>(
    State(service): State<Arc<VisitService<R>>>,
    UuidPath(id): UuidPath,
) -> PatientResult<Json<Visit>> {
    let visit = service.get_visit(id).await?;
    Ok(Json(visit))
}

/// Update a visit
#[utoipa::path(
    patch,
    path = "/visites/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Visit ID")
    ),
    request_body = UpdateVisit,
    responses(
        (status = 200, description = "Visit updated", body = Visit),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_visit<R: PatientRepository>(
    State(service): State<Arc<VisitService<R>>>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateVisit>,
) -> PatientResult<Json<Visit>> {
    let visit = service.update_visit(id, input).await?;
    Ok(Json(visit))
}
