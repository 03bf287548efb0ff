use axum::{Router, middleware};
use axum_helpers::{AuthorizationState, JwtAuth, authorize};
use domain_patients::{PatientRepository, PatientService, PgPatientRepository, VisitService};
use domain_pharmacy::{PgPharmacyRepository, PharmacyRepository, PharmacyService};
use domain_users::{AuthService, PgUserRepository, UserRepository, UserService};
use std::sync::Arc;

use crate::state::AppState;

pub mod health;
pub mod policy;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix is added by `create_router`.
///
/// Every domain runs over its PostgreSQL repository; the pool is shared.
pub fn routes(state: &AppState) -> Router {
    let pharmacy = PharmacyService::new(
        PgPharmacyRepository::new(state.db.clone()),
        state.config.invoice.clone(),
    );
    let patients = Arc::new(PgPatientRepository::new(state.db.clone()));
    let users = UserService::new(PgUserRepository::new(state.db.clone()));

    compose(pharmacy, patients, users, state.jwt_auth.clone())
}

/// Mounts the domain routers under `/v1` behind the `authorize` middleware.
pub fn compose<P, Q, U>(
    pharmacy: PharmacyService<P>,
    patients: Arc<Q>,
    users: UserService<U>,
    jwt_auth: JwtAuth,
) -> Router
where
    P: PharmacyRepository + 'static,
    Q: PatientRepository + 'static,
    U: UserRepository + 'static,
{
    let auth = AuthService::new(users.clone(), jwt_auth.clone());

    let v1 = Router::new()
        .nest("/pharmacy", domain_pharmacy::handlers::router(pharmacy))
        .merge(domain_patients::handlers::router(PatientService::new(Arc::clone(&patients))))
        .merge(domain_patients::visit_handlers::visits_router(VisitService::new(patients)))
        .nest("/admin", domain_users::handlers::router(users))
        .nest("/auth", domain_users::auth_handlers::auth_router(auth));

    Router::new()
        .nest("/v1", v1)
        .layer(middleware::from_fn_with_state(
            AuthorizationState::new(jwt_auth, policy::policy_table()),
            authorize,
        ))
}

/// Creates a router with the /ready endpoint that checks PostgreSQL and Redis.
///
/// State is applied here so it merges with the stateless app router.
pub fn ready_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum_helpers::{InMemoryTokenStore, JwtConfig};
    use domain_patients::InMemoryPatientRepository;
    use domain_pharmacy::{InMemoryPharmacyRepository, InvoiceConfig};
    use domain_users::{CreateUser, InMemoryUserRepository, Role};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt; // For oneshot()

    const PASSWORD: &str = "s3cret-pass";

    struct Fixture {
        app: Router,
        users: UserService<InMemoryUserRepository>,
    }

    fn fixture() -> Fixture {
        let jwt_auth = JwtAuth::new(
            Arc::new(InMemoryTokenStore::new()),
            &JwtConfig::new("clinic-test-secret-with-at-least-32-chars").unwrap(),
        );
        let users = UserService::new(InMemoryUserRepository::new());
        let api = compose(
            PharmacyService::new(InMemoryPharmacyRepository::new(), InvoiceConfig::default()),
            Arc::new(InMemoryPatientRepository::new()),
            users.clone(),
            jwt_auth,
        );

        Fixture {
            app: Router::new().nest("/api", api),
            users,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

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

    async fn login_as(fixture: &Fixture, email: &str, roles: Vec<Role>, abilities: Option<Vec<&str>>) -> String {
        fixture
            .users
            .create_user(CreateUser {
                email: email.to_string(),
                name: "Staff".to_string(),
                password: PASSWORD.to_string(),
                roles,
                abilities: abilities.map(|a| a.into_iter().map(String::from).collect()),
            })
            .await
            .unwrap();

        let (status, body) = send(
            &fixture.app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_every_policy_route_is_mounted() {
        let fixture = fixture();
        let token = login_as(&fixture, "root@clinic.test", vec![Role::Admin], None).await;

        // Logout would revoke the token mid-loop; it has its own test
        for route in policy::policy_table().routes().iter().filter(|r| !r.path.ends_with("/logout")) {
            let path = route
                .path
                .replace("{id}", "0192f0c4-7d35-7000-8000-000000000001");
            let (status, body) = send(&fixture.app, route.method.as_str(), &path, Some(&token), None).await;

            // An unmatched route is an empty 404/405; handler misses carry an error body
            if status == StatusCode::NOT_FOUND {
                assert_eq!(body["error"], "NOT_FOUND", "{} {} is not mounted", route.method, path);
            }
            assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", route.method, path);
            assert_ne!(status, StatusCode::FORBIDDEN, "{} {}", route.method, path);
            assert_ne!(status, StatusCode::UNAUTHORIZED, "{} {}", route.method, path);
        }
    }

    #[tokio::test]
    async fn test_login_is_public_and_me_needs_token() {
        let fixture = fixture();
        let token = login_as(&fixture, "nurse@clinic.test", vec![Role::Receptionist], None).await;

        let (status, body) = send(&fixture.app, "GET", "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");

        let (status, me) = send(&fixture.app, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "nurse@clinic.test");
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let fixture = fixture();
        let (status, body) = send(&fixture.app, "GET", "/api/v1/patients", Some("not.a.jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_missing_ability_is_forbidden_before_validation() {
        let fixture = fixture();
        let token = login_as(&fixture, "desk@clinic.test", vec![Role::Receptionist], None).await;

        let (status, _) = send(&fixture.app, "GET", "/api/v1/patients", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        // Receptionists cannot read history or sell, whatever the body says
        let (status, _) = send(
            &fixture.app,
            "GET",
            "/api/v1/patients/0192f0c4-7d35-7000-8000-000000000001/history",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &fixture.app,
            "POST",
            "/api/v1/pharmacy/cart/items",
            Some(&token),
            Some(json!({"quantity": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_role() {
        let fixture = fixture();
        let wildcard = login_as(&fixture, "lead@clinic.test", vec![Role::Clinician], Some(vec!["*"])).await;
        let admin = login_as(&fixture, "root@clinic.test", vec![Role::Admin], None).await;

        let (status, _) = send(&fixture.app, "GET", "/api/v1/admin/users", Some(&wildcard), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, page) = send(&fixture.app, "GET", "/api/v1/admin/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let fixture = fixture();
        let token = login_as(&fixture, "pharma@clinic.test", vec![Role::Pharmacist], None).await;

        let (status, _) = send(&fixture.app, "GET", "/api/v1/pharmacy/cart", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&fixture.app, "POST", "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&fixture.app, "GET", "/api/v1/pharmacy/cart", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unlisted_route_is_forbidden() {
        let fixture = fixture();
        let (status, _) = send(&fixture.app, "PUT", "/api/v1/patients/1", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
