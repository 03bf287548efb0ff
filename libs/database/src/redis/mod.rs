//! Redis connection management. The pool backs the JWT whitelist/blacklist.

mod config;
mod connector;

pub use config::RedisConfig;
pub use connector::{check_health, connect, connect_from_config_with_retry};

pub use redis::aio::ConnectionManager;
