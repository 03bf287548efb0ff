//! Authentication and authorization.
//!
//! - JWT access tokens (HS256) carrying roles and abilities
//! - [`TokenStore`] whitelist/blacklist, Redis-backed in production
//! - [`policy`]: the route table and the single `authorize` middleware
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtConfig, RedisAuthStore};
//! use core_config::FromEnv;
//!
//! let config = JwtConfig::from_env()?;
//! let auth = JwtAuth::new(Arc::new(RedisAuthStore::new(redis_manager)), &config);
//! ```

pub mod config;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod policy;
pub mod store;

pub use config::JwtConfig;
pub use error::AuthError;
pub use jwt::{ACCESS_TOKEN_TTL, IssuedToken, JwtAuth, JwtClaims, TokenSubject, WILDCARD_ABILITY};
pub use middleware::{AuthUser, extract_token_from_request};
pub use policy::{AuthorizationState, PolicyTable, Requirement, RoutePolicy, authorize};
pub use store::{InMemoryTokenStore, RedisAuthStore, TokenStore};
