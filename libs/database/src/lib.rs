//! Connectors for the clinic's two stores: PostgreSQL (SeaORM) for records
//! and Redis for the token whitelist/blacklist.
//!
//! ```ignore
//! use database::{postgres, redis, common::RetryConfig};
//! use core_config::FromEnv;
//!
//! let db = postgres::connect_from_config_with_retry(
//!     postgres::PostgresConfig::from_env()?,
//!     Some(RetryConfig::from_env()?),
//! ).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "clinic_api").await?;
//!
//! let manager = redis::connect_from_config_with_retry(redis::RedisConfig::from_env()?, None).await?;
//! ```

pub mod common;
pub mod postgres;
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};
