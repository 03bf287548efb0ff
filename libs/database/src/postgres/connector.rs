use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, error, info};

use super::PostgresConfig;
use crate::common::{DatabaseError, RetryConfig, retry, retry_with_backoff};

/// Connect using a [`PostgresConfig`].
pub async fn connect_from_config(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.into_connect_options()).await?;
    info!("Successfully connected to PostgreSQL database");
    Ok(db)
}

/// Connect with exponential backoff, for startup against a database that may
/// still be coming up.
pub async fn connect_from_config_with_retry(
    config: PostgresConfig,
    retry_config: Option<RetryConfig>,
) -> Result<DatabaseConnection, DbErr> {
    let attempt = || connect_from_config(config.clone());

    match retry_config {
        Some(policy) => retry_with_backoff(attempt, policy).await,
        None => retry(attempt).await,
    }
}

/// Apply all pending migrations of `M`.
///
/// ```ignore
/// run_migrations::<migration::Migrator>(&db, "clinic_api").await?;
/// ```
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> Result<(), DbErr> {
    info!("Running {} database migrations...", app_name);
    M::up(db, None).await?;
    info!("Migrations completed successfully for {}", app_name);
    Ok(())
}

/// Close the pool during shutdown, logging the outcome.
pub async fn close(db: DatabaseConnection) {
    match db.close().await {
        Ok(()) => info!("PostgreSQL connection pool closed"),
        Err(e) => error!("Error closing PostgreSQL connection pool: {}", e),
    }
}

/// Readiness probe: one `SELECT 1` round trip through the pool.
pub async fn check_health(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    debug!("Probing PostgreSQL");
    let probe = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1");
    match db.query_one_raw(probe).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(DatabaseError::unhealthy("postgres", "SELECT 1 returned no row")),
        Err(e) => Err(DatabaseError::unhealthy("postgres", e)),
    }
}
