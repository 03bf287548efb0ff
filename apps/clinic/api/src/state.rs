//! Shared application state.
//!
//! Built once in `main` and cloned into the routers that need it. Clones are
//! cheap: the connection pool, the Redis manager and `JwtAuth` are all
//! reference counted.

use axum_helpers::JwtAuth;
use database::postgres::DatabaseConnection;
use database::redis::ConnectionManager;

#[derive(Clone)]
pub struct AppState {
    /// Configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: DatabaseConnection,
    /// Redis connection manager, backing the token store
    pub redis: ConnectionManager,
    /// Token issue and verification
    pub jwt_auth: JwtAuth,
}
