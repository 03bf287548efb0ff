//! Route authorization policy.
//!
//! One static table maps `(method, path pattern)` to a [`Requirement`]. The
//! [`authorize`] middleware looks the request up before any handler runs:
//! unlisted routes are denied with 403, a missing or bad token is 401, and a
//! token without the required role or ability is 403.
//!
//! ```ignore
//! let table = PolicyTable::new()
//!     .route(Method::POST, "/api/v1/auth/login", Requirement::Public)
//!     .route(Method::GET, "/api/v1/patients/{id}", Requirement::Ability("patients.read"));
//!
//! let api = api.layer(middleware::from_fn_with_state(
//!     AuthorizationState::new(jwt_auth, table),
//!     authorize,
//! ));
//! ```

use super::error::AuthError;
use super::jwt::{JwtAuth, JwtClaims};
use super::middleware::extract_token_from_request;
use crate::audit::{AuditEvent, AuditOutcome};
use crate::errors::AppError;
use axum::{
    extract::{OriginalUri, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::sync::Arc;

/// What a caller must present to reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    Ability(&'static str),
    RoleAndAbility {
        role: &'static str,
        ability: &'static str,
    },
}

impl Requirement {
    /// Checks an authenticated caller. Returns the reason on denial.
    pub fn check(&self, claims: &JwtClaims) -> Result<(), String> {
        match *self {
            Requirement::Public | Requirement::Authenticated => Ok(()),
            Requirement::Ability(ability) => {
                if claims.has_ability(ability) {
                    Ok(())
                } else {
                    Err(format!("Missing ability {}", ability))
                }
            }
            Requirement::RoleAndAbility { role, ability } => {
                if !claims.has_role(role) {
                    Err(format!("Missing role {}", role))
                } else if !claims.has_ability(ability) {
                    Err(format!("Missing ability {}", ability))
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Public => write!(f, "public"),
            Requirement::Authenticated => write!(f, "authenticated"),
            Requirement::Ability(ability) => write!(f, "{}", ability),
            Requirement::RoleAndAbility { role, ability } => write!(f, "role {} + {}", role, ability),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub method: Method,
    pub path: &'static str,
    pub requirement: Requirement,
}

/// Ordered list of route policies; first match wins.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    routes: Vec<RoutePolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, path: &'static str, requirement: Requirement) -> Self {
        self.routes.push(RoutePolicy {
            method,
            path,
            requirement,
        });
        self
    }

    pub fn routes(&self) -> &[RoutePolicy] {
        &self.routes
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<Requirement> {
        self.routes
            .iter()
            .find(|policy| policy.method == *method && path_matches(policy.path, path))
            .map(|policy| policy.requirement)
    }
}

/// `{name}` segments match any single non-empty segment.
fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.trim_end_matches('/').split('/');
    let mut path_segments = path.trim_end_matches('/').split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                let is_param = expected.starts_with('{') && expected.ends_with('}');
                if is_param {
                    if actual.is_empty() {
                        return false;
                    }
                } else if expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// State for the [`authorize`] middleware.
#[derive(Clone)]
pub struct AuthorizationState {
    pub auth: JwtAuth,
    pub table: Arc<PolicyTable>,
}

impl AuthorizationState {
    pub fn new(auth: JwtAuth, table: PolicyTable) -> Self {
        Self {
            auth,
            table: Arc::new(table),
        }
    }
}

/// Single authorization stage for every `/api` route.
///
/// Uses the original (un-nested) URI so the table holds full paths.
pub async fn authorize(
    State(state): State<AuthorizationState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().clone();

    let Some(requirement) = state.table.lookup(&method, &path) else {
        tracing::info!(%method, %path, "Route not in policy table");
        return Err(AppError::Forbidden("Route is not permitted".to_string()));
    };

    if requirement == Requirement::Public {
        return Ok(next.run(request).await);
    }

    let token = extract_token_from_request(request.headers()).ok_or(AuthError::MissingToken)?;
    let claims = state.auth.authenticate(&token).await?;

    if let Err(reason) = requirement.check(&claims) {
        AuditEvent::new(
            Some(claims.sub.clone()),
            "route.access",
            Some(format!("{} {}", method, path)),
            AuditOutcome::Denied,
        )
        .with_request(request.headers())
        .with_details(serde_json::json!({ "requirement": requirement.to_string() }))
        .log();
        return Err(AppError::Forbidden(reason));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(roles: &[&str], abilities: &[&str]) -> JwtClaims {
        JwtClaims {
            sub: uuid::Uuid::nil().to_string(),
            email: "staff@clinic.test".into(),
            name: "Staff".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            abilities: abilities.iter().map(|a| a.to_string()).collect(),
            exp: 0,
            iat: 0,
            jti: "jti".into(),
        }
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/api/v1/patients/{id}", "/api/v1/patients/42"));
        assert!(path_matches("/api/v1/patients/{id}/restore", "/api/v1/patients/42/restore/"));
        assert!(!path_matches("/api/v1/patients/{id}", "/api/v1/patients"));
        assert!(!path_matches("/api/v1/patients/{id}", "/api/v1/patients/42/history"));
        assert!(!path_matches("/api/v1/patients", "/api/v1/visites"));
    }

    #[test]
    fn test_lookup_respects_method() {
        let table = PolicyTable::new()
            .route(Method::GET, "/api/v1/pharmacy/lots", Requirement::Ability("pharmacy.read"))
            .route(Method::POST, "/api/v1/pharmacy/lots", Requirement::Ability("pharmacy.write"));

        assert_eq!(
            table.lookup(&Method::POST, "/api/v1/pharmacy/lots"),
            Some(Requirement::Ability("pharmacy.write"))
        );
        assert_eq!(table.lookup(&Method::PUT, "/api/v1/pharmacy/lots"), None);
    }

    #[test]
    fn test_role_and_ability_requires_both() {
        let requirement = Requirement::RoleAndAbility {
            role: "admin",
            ability: "users.manage",
        };
        assert!(requirement.check(&claims(&["admin"], &["users.manage"])).is_ok());
        assert!(requirement.check(&claims(&["pharmacist"], &["*"])).is_err());
        assert!(requirement.check(&claims(&["admin"], &["patients.read"])).is_err());
    }
}
