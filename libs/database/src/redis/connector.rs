use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::RedisConfig;
use crate::common::{DatabaseError, RetryConfig, retry, retry_with_backoff};

/// Open a [`ConnectionManager`] and verify it with `PING`.
///
/// The manager reconnects on its own after transient failures.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    info!("Attempting to connect to Redis");

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    ping(&mut manager.clone()).await?;

    info!("Successfully connected to Redis");
    Ok(manager)
}

pub async fn connect_from_config_with_retry(
    config: RedisConfig,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let url = config.connection_url();

    match retry_config {
        Some(policy) => retry_with_backoff(|| connect(&url), policy).await,
        None => retry(|| connect(&url)).await,
    }
}

async fn ping(conn: &mut ConnectionManager) -> redis::RedisResult<String> {
    redis::cmd("PING").query_async(conn).await
}

/// Readiness probe. A server still loading its dataset answers `PING`
/// with an error, which is reported as unhealthy.
pub async fn check_health(conn: &mut ConnectionManager) -> Result<(), DatabaseError> {
    debug!("Probing Redis");
    match ping(conn).await {
        Ok(reply) if reply == "PONG" => Ok(()),
        Ok(reply) => Err(DatabaseError::unhealthy("redis", format!("PING returned {:?}", reply))),
        Err(e) => Err(DatabaseError::unhealthy("redis", e)),
    }
}
