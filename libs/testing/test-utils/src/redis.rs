//! Redis 8 container for the token whitelist and blacklist.

use redis::Client;
use redis::aio::ConnectionManager;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// ```no_run
/// use test_utils::TestRedis;
///
/// # async fn example() {
/// let redis = TestRedis::new().await;
/// let manager = redis.manager();
/// # }
/// ```
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    manager: ConnectionManager,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Redis container should start");
        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Redis port should be mapped");

        let client = Client::open(format!("redis://127.0.0.1:{}", port)).expect("Redis URL should parse");
        let manager = ConnectionManager::new(client)
            .await
            .expect("test Redis should accept connections");

        tracing::info!(port, "Test Redis ready");
        Self {
            _container: container,
            manager,
        }
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }
}
