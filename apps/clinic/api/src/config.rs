use axum_helpers::JwtConfig;
use core_config::{AppInfo, ConfigError, FromEnv, app_info, env_optional, server::ServerConfig};
use database::common::RetryConfig;
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_pharmacy::InvoiceConfig;

pub use core_config::Environment;

/// Credentials for the first administrator, created on an empty users table.
///
/// Loaded from `ADMIN_EMAIL` and `ADMIN_PASSWORD`; both must be set.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl BootstrapAdmin {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (env_optional::<String>("ADMIN_EMAIL")?, env_optional::<String>("ADMIN_PASSWORD")?) {
            (Some(email), Some(password)) => Ok(Some(Self { email, password })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("ADMIN_EMAIL".to_string())),
        }
    }
}

/// Clinic API configuration, composed from the shared config components.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub retry: RetryConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub invoice: InvoiceConfig,
    pub admin: Option<BootstrapAdmin>,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // DATABASE_URL is required
        let redis = RedisConfig::from_env()?;
        let retry = RetryConfig::from_env()?;
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=8080 by default
        let jwt = JwtConfig::from_env()?; // JWT_SECRET, at least 32 chars
        let invoice = InvoiceConfig::from_env()?;
        let admin = BootstrapAdmin::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            redis,
            retry,
            server,
            jwt,
            invoice,
            admin,
            environment,
        })
    }
}
