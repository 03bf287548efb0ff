//! JWT configuration, loaded through `core_config::FromEnv` like the
//! database and redis configs.

use core_config::{ConfigError, FromEnv, env_parse_or, env_required};

use super::jwt::ACCESS_TOKEN_TTL;

const MIN_SECRET_LEN: usize = 32;

/// JWT authentication configuration.
///
/// Loaded from environment variables:
/// - `JWT_SECRET` (required) - at least 32 characters
/// - `JWT_ACCESS_TTL_SECS` (optional) - access token lifetime, default 900
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// JWT signing secret (minimum 32 characters)
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
}

impl JwtConfig {
    /// Build a config from an explicit secret, mostly for tests and tooling.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        check_secret(&secret)?;
        Ok(Self {
            secret,
            access_ttl_secs: ACCESS_TOKEN_TTL,
        })
    }
}

fn check_secret(secret: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::ParseError {
            key: "JWT_SECRET".to_string(),
            details: format!(
                "must be at least {} characters (got {}). Generate one with: openssl rand -base64 32",
                MIN_SECRET_LEN,
                secret.len()
            ),
        });
    }
    Ok(())
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = env_required("JWT_SECRET")?;
        check_secret(&secret)?;
        let access_ttl_secs = env_parse_or("JWT_ACCESS_TTL_SECS", ACCESS_TOKEN_TTL)?;

        Ok(Self {
            secret,
            access_ttl_secs,
        })
    }
}
