use core_config::{ConfigError, FromEnv, env_optional, env_or_default};

/// Redis connection settings.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    /// Logical database index selected after connecting
    pub database: Option<u8>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    /// Connection URL with the database index appended, when one is set.
    pub fn connection_url(&self) -> String {
        match self.database {
            Some(db) => format!("{}/{}", self.url.trim_end_matches('/'), db),
            None => self.url.clone(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

/// Environment variables:
/// - `REDIS_URL` (default: `redis://127.0.0.1:6379`)
/// - `REDIS_DATABASE` (optional)
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_or_default("REDIS_URL", "redis://127.0.0.1:6379");
        let database = env_optional("REDIS_DATABASE")?;
        Ok(Self { url, database })
    }
}
