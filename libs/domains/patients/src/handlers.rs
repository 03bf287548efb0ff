use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    AuditEvent, AuditOutcome, AuthUser, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::PatientResult;
use crate::models::{
    CreatePatient, HistoryAction, Patient, PatientFilter, PatientHistoryEntry, PatientPage, Sex,
    UpdatePatient,
};
use crate::repository::PatientRepository;
use crate::service::PatientService;

pub const TAG: &str = "patients";

/// OpenAPI documentation for the Patients API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        delete_patient,
        restore_patient,
        patient_history,
    ),
    components(
        schemas(
            Patient, PatientPage, PatientFilter, CreatePatient, UpdatePatient, Sex,
            PatientHistoryEntry, HistoryAction
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Patient registry with soft delete and history")
    )
)]
pub struct ApiDoc;

/// Create the patients router. Mutating routes record the caller from
/// [`AuthUser`] claims as the history actor.
pub fn router<R: PatientRepository + 'static>(service: PatientService<R>) -> Router {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/{id}",
            get(get_patient).patch(update_patient).delete(delete_patient),
        )
        .route("/patients/{id}/restore", post(restore_patient))
        .route("/patients/{id}/history", get(patient_history))
        .with_state(Arc::new(service))
}

fn actor(user: &AuthUser) -> Option<Uuid> {
    user.claims().user_id().ok()
}

/// List patients
#[utoipa::path(
    get,
    path = "/patients",
    tag = TAG,
    params(PatientFilter),
    responses(
        (status = 200, description = "Patients ordered by name", body = PatientPage),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_patients<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    Query(filter): Query<PatientFilter>,
) -> PatientResult<Json<PatientPage>> {
    let page = service.list_patients(filter).await?;
    Ok(Json(page))
}

/// Register a patient
#[utoipa::path(
    post,
    path = "/patients",
    tag = TAG,
    request_body = CreatePatient,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn create_patient<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreatePatient>,
) -> PatientResult<impl IntoResponse> {
    let patient = service.create_patient(input, actor(&user)).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// Get a patient
#[utoipa::path(
    get,
    path = "/patients/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient found", body = Patient),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_patient<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    UuidPath(id): UuidPath,
) -> PatientResult<Json<Patient>> {
    let patient = service.get_patient(id).await?;
    Ok(Json(patient))
}

/// Update a patient
///
/// Only the fields present in the body change.
#[utoipa::path(
    patch,
    path = "/patients/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Patient ID")
    ),
    request_body = UpdatePatient,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn update_patient<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    user: AuthUser,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdatePatient>,
) -> PatientResult<Json<Patient>> {
    let patient = service.update_patient(id, input, actor(&user)).await?;
    Ok(Json(patient))
}

/// Soft-delete a patient
#[utoipa::path(
    delete,
    path = "/patients/{id}",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Patient ID")
    ),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn delete_patient<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    user: AuthUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> PatientResult<StatusCode> {
    service.delete_patient(id, actor(&user)).await?;

    AuditEvent::new(
        Some(user.claims().sub.clone()),
        "patient.delete",
        Some(format!("patient:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(StatusCode::NO_CONTENT)
}

/// Restore a soft-deleted patient
#[utoipa::path(
    post,
    path = "/patients/{id}/restore",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient restored", body = Patient),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
async fn restore_patient<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    user: AuthUser,
    headers: HeaderMap,
    UuidPath(id): UuidPath,
) -> PatientResult<Json<Patient>> {
    let patient = service.restore_patient(id, actor(&user)).await?;

    AuditEvent::new(
        Some(user.claims().sub.clone()),
        "patient.restore",
        Some(format!("patient:{}", id)),
        AuditOutcome::Success,
    )
    .with_request(&headers)
    .log();

    Ok(Json(patient))
}

/// Change history of a patient, oldest first
#[utoipa::path(
    get,
    path = "/patients/{id}/history",
    tag = TAG,
    params(
        ("id" = Uuid, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "History entries", body = Vec<PatientHistoryEntry>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn patient_history<R: PatientRepository>(
    State(service): State<Arc<PatientService<R>>>,
    UuidPath(id): UuidPath,
) -> PatientResult<Json<Vec<PatientHistoryEntry>>> {
    let history = service.history(id).await?;
    Ok(Json(history))
}
