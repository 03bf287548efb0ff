//! Handler tests for the Patients domain
//!
//! Both routers run over one in-memory repository. Claims for mutating
//! routes are placed in the request extensions, as the app's `authorize`
//! middleware does.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_helpers::JwtClaims;
use domain_patients::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

// Helper to parse JSON response body
async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn clinician() -> JwtClaims {
    JwtClaims {
        sub: Uuid::now_v7().to_string(),
        email: "doc@clinic.test".into(),
        name: "Doc".into(),
        roles: vec!["clinician".into()],
        abilities: vec!["patients.*".into(), "visites.*".into()],
        exp: i64::MAX,
        iat: 0,
        jti: Uuid::now_v7().to_string(),
    }
}

fn request(method: &str, uri: &str, body: Option<Value>, claims: Option<&JwtClaims>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let mut request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    if let Some(claims) = claims {
        request.extensions_mut().insert(claims.clone());
    }
    request
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn app() -> Router {
    let repo = Arc::new(InMemoryPatientRepository::new());
    handlers::router(PatientService::new(Arc::clone(&repo)))
        .merge(visit_handlers::visits_router(VisitService::new(repo)))
}

async fn create_patient(app: &Router, claims: &JwtClaims, last_name: &str) -> Value {
    let (status, patient) = send(
        app,
        request(
            "POST",
            "/patients",
            Some(json!({"first_name": "Jane", "last_name": last_name, "sex": "female"})),
            Some(claims),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    patient
}

#[tokio::test]
async fn test_create_and_get_patient() {
    let app = app();
    let claims = clinician();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/patients",
            Some(json!({
                "first_name": "Jane",
                "last_name": "Doe",
                "birth_date": "1985-04-12",
                "email": "Jane@Example.test"
            })),
            Some(&claims),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Patient = json_body(response.into_body()).await;
    assert_eq!(created.email.as_deref(), Some("jane@example.test"));

    let (status, fetched) = send(&app, request("GET", &format!("/patients/{}", created.id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["last_name"], "Doe");
    assert_eq!(fetched["birth_date"], "1985-04-12");
    assert!(fetched["deleted_at"].is_null());
}

#[tokio::test]
async fn test_create_patient_validation_details() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/patients",
            Some(json!({"last_name": "", "birth_date": "12/04/1985", "email": "nope"})),
            Some(&clinician()),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["first_name"][0]["code"], "required");
    assert_eq!(body["details"]["birth_date"][0]["code"], "date");
    assert!(body["details"]["last_name"].is_array());
    assert!(body["details"]["email"].is_array());
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let app = app();
    let (status, _) = send(&app, request("GET", "/patients/not-a-uuid", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_soft_delete_restore_and_history() {
    let app = app();
    let claims = clinician();
    let patient = create_patient(&app, &claims, "Doe").await;
    let id = patient["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, request("DELETE", &format!("/patients/{}", id), None, Some(&claims))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request("GET", &format!("/patients/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&app, request("GET", "/patients", None, None)).await;
    assert_eq!(listed["total"], 0);
    let (_, listed) = send(&app, request("GET", "/patients?include_deleted=true", None, None)).await;
    assert_eq!(listed["total"], 1);
    assert!(!listed["data"][0]["deleted_at"].is_null());

    let (status, restored) = send(
        &app,
        request("POST", &format!("/patients/{}/restore", id), None, Some(&claims)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(restored["deleted_at"].is_null());

    let (status, body) = send(
        &app,
        request("POST", &format!("/patients/{}/restore", id), None, Some(&claims)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, history) = send(&app, request("GET", &format!("/patients/{}/history", id), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created", "deleted", "restored"]);
    assert_eq!(history[1]["actor_id"], claims.sub.as_str());
}

#[tokio::test]
async fn test_patch_changes_only_given_fields() {
    let app = app();
    let claims = clinician();
    let patient = create_patient(&app, &claims, "Doe").await;
    let id = patient["id"].as_str().unwrap();

    let (status, updated) = send(
        &app,
        request(
            "PATCH",
            &format!("/patients/{}", id),
            Some(json!({"phone": "555-0100"})),
            Some(&claims),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "555-0100");
    assert_eq!(updated["last_name"], "Doe");
    assert_eq!(updated["sex"], "female");

    let (_, history) = send(&app, request("GET", &format!("/patients/{}/history", id), None, None)).await;
    assert_eq!(history[1]["changes"], json!({"phone": {"from": null, "to": "555-0100"}}));
}

#[tokio::test]
async fn test_mutation_without_claims_is_unauthorized() {
    let app = app();
    let (status, _) = send(
        &app,
        request("POST", "/patients", Some(json!({"first_name": "A", "last_name": "B"})), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_visit_lifecycle() {
    let app = app();
    let claims = clinician();
    let patient = create_patient(&app, &claims, "Doe").await;

    let (status, visit) = send(
        &app,
        request(
            "POST",
            "/visites",
            Some(json!({
                "patient_id": patient["id"],
                "visited_at": "2026-03-01T09:30:00Z",
                "reason": "Annual checkup"
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(visit["status"], "scheduled");

    let id = visit["id"].as_str().unwrap();
    let (status, updated) = send(
        &app,
        request(
            "PATCH",
            &format!("/visites/{}", id),
            Some(json!({"status": "in_progress", "notes": "BP normal"})),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in_progress");
    assert_eq!(updated["reason"], "Annual checkup");

    let (_, page) = send(
        &app,
        request("GET", &format!("/visites?patient_id={}&status=in_progress", patient["id"].as_str().unwrap()), None, None),
    )
    .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["id"], id);
}

#[tokio::test]
async fn test_visit_for_unknown_patient_is_field_error() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/visites",
            Some(json!({"patient_id": Uuid::now_v7(), "reason": "Fever"})),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["patient_id"][0]["code"], "exists");
}

#[tokio::test]
async fn test_visit_not_found() {
    let app = app();
    let (status, body) = send(&app, request("GET", &format!("/visites/{}", Uuid::now_v7()), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}
