/// Failures of the connector layer: connecting, migrating and probing.
///
/// Repositories keep their own domain errors; this type never reaches an
/// HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Postgres(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error("{store} is not ready: {reason}")]
    Unhealthy { store: &'static str, reason: String },

    #[error(transparent)]
    Config(#[from] core_config::ConfigError),
}

impl DatabaseError {
    pub(crate) fn unhealthy(store: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Unhealthy {
            store,
            reason: reason.to_string(),
        }
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhealthy_names_the_store() {
        let err = DatabaseError::unhealthy("redis", "PING returned \"LOADING\"");
        assert_eq!(err.to_string(), "redis is not ready: PING returned \"LOADING\"");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: DatabaseError = core_config::ConfigError::MissingEnvVar("DATABASE_URL".into()).into();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
