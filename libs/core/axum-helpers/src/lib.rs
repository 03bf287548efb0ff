//! # Axum Helpers
//!
//! Shared web plumbing for the clinic services.
//!
//! ## Modules
//!
//! - **[`auth`]**: JWT access tokens, token store, route policy table and `authorize` middleware
//! - **[`server`]**: Router assembly, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: `AppError` and the shared `ErrorResponse` body
//! - **[`extractors`]**: `ValidatedJson`, `UuidPath`, `IdPath`
//! - **[`audit`]**: Audit events on the `audit` tracing target

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use auth::{
    ACCESS_TOKEN_TTL, AuthError, AuthUser, AuthorizationState, InMemoryTokenStore, IssuedToken,
    JwtAuth, JwtClaims, JwtConfig, PolicyTable, RedisAuthStore, Requirement, TokenStore,
    TokenSubject, authorize,
};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};

pub use http::{cors_layer_from_env, create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse};

pub use extractors::{IdPath, UuidPath, ValidatedJson};

pub use audit::{AuditEvent, AuditOutcome, ClientInfo, extract_ip_from_headers, extract_user_agent};
