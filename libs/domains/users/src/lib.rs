//! Users Domain
//!
//! Staff accounts, roles and abilities, password hashing and the bearer
//! token session (login, logout, me).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ handlers / auth_handlers     │  ← admin and session routers
//! └──────┬───────────────────────┘
//!        │
//! ┌──────▼──────┐     ┌─────────┐
//! │   Service   │ ──► │ JwtAuth │  ← token issue and revocation
//! └──────┬──────┘     └─────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← in-memory or PostgreSQL
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{InMemoryTokenStore, JwtAuth, JwtConfig};
//! use domain_users::{AuthService, InMemoryUserRepository, UserService};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let jwt = JwtAuth::new(Arc::new(InMemoryTokenStore::new()), &JwtConfig::new("x".repeat(32))?);
//! let users = UserService::new(InMemoryUserRepository::new());
//! let admin = domain_users::handlers::router(users.clone());
//! let auth = domain_users::auth_handlers::auth_router(AuthService::new(users, jwt));
//! # Ok(())
//! # }
//! ```

pub mod auth_handlers;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use auth_handlers::AuthApiDoc;
pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use models::{
    CreateUser, LoginRequest, Role, TokenResponse, User, UserFilter, UserPage, UserResponse,
    abilities_for,
};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::{AuthService, UserService, hash_password, verify_password};
