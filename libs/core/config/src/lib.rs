//! Environment-driven configuration shared by the clinic crates.
//!
//! Every component config implements [`FromEnv`] and is composed by the
//! binary at startup; a missing or unparsable variable fails fast with the
//! variable's name in the message.

pub mod server;
pub mod tracing;

use serde::Serialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Name and version reported by `/health` and the startup log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl AppInfo {
    pub const fn new(name: &'static str, version: &'static str) -> Self {
        Self { name, version }
    }
}

/// [`AppInfo`] from the calling crate's Cargo metadata.
#[macro_export]
macro_rules! app_info {
    () => {
        $crate::AppInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    };
}

/// `APP_ENV`: `production` (any case) or anything else for development.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        env::var("APP_ENV").map(|raw| Self::parse(&raw)).unwrap_or_default()
    }

    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// `Ok(None)` when unset; a set but unparsable value is an error.
pub fn env_optional<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    raw.parse().map(Some).map_err(|e: T::Err| ConfigError::ParseError {
        key: key.to_string(),
        details: e.to_string(),
    })
}

pub fn env_parse_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_optional(key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" Production "), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }

    #[test]
    fn test_environment_from_env() {
        temp_env::with_var_unset("APP_ENV", || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert!(Environment::from_env().is_production());
        });
    }

    #[test]
    fn test_env_required_names_the_variable() {
        temp_env::with_var_unset("CLINIC_REQUIRED", || {
            let err = env_required("CLINIC_REQUIRED").unwrap_err();
            assert_eq!(
                err.to_string(),
                "Environment variable 'CLINIC_REQUIRED' is required but not set"
            );
        });
        temp_env::with_var("CLINIC_REQUIRED", Some("x"), || {
            assert_eq!(env_required("CLINIC_REQUIRED").unwrap(), "x");
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var_unset("CLINIC_HOST", || {
            assert_eq!(env_or_default("CLINIC_HOST", "0.0.0.0"), "0.0.0.0");
        });
    }

    #[test]
    fn test_env_optional() {
        temp_env::with_var_unset("CLINIC_DB_INDEX", || {
            assert_eq!(env_optional::<u8>("CLINIC_DB_INDEX").unwrap(), None);
        });
        temp_env::with_var("CLINIC_DB_INDEX", Some("2"), || {
            assert_eq!(env_optional::<u8>("CLINIC_DB_INDEX").unwrap(), Some(2));
        });
        temp_env::with_var("CLINIC_DB_INDEX", Some("two"), || {
            let err = env_optional::<u8>("CLINIC_DB_INDEX").unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "CLINIC_DB_INDEX"));
        });
    }

    #[test]
    fn test_env_parse_or() {
        temp_env::with_var_unset("CLINIC_RETRIES", || {
            assert_eq!(env_parse_or("CLINIC_RETRIES", 3u32).unwrap(), 3);
        });
        temp_env::with_var("CLINIC_RETRIES", Some("many"), || {
            assert!(env_parse_or::<u32>("CLINIC_RETRIES", 3).is_err());
        });
    }

    #[test]
    fn test_app_info_macro_uses_crate_metadata() {
        let info = app_info!();
        assert_eq!(info.name, "core_config");
        assert!(!info.version.is_empty());
    }
}
