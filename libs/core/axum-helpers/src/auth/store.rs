use super::error::AuthError;
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Whitelist/blacklist storage for issued token ids (`jti`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Record an issued token for `ttl_seconds`
    async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> Result<(), AuthError>;

    async fn is_whitelisted(&self, jti: &str) -> Result<bool, AuthError>;

    /// Deny a token id for the rest of its lifetime
    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> Result<(), AuthError>;

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, AuthError>;

    /// Remove a token id from the whitelist (logout)
    async fn revoke(&self, jti: &str) -> Result<(), AuthError>;
}

fn whitelist_key(jti: &str) -> String {
    format!("jwt:whitelist:{}", jti)
}

fn blacklist_key(jti: &str) -> String {
    format!("jwt:blacklist:{}", jti)
}

/// Redis-backed token store
#[derive(Clone)]
pub struct RedisAuthStore {
    client: ConnectionManager,
}

impl RedisAuthStore {
    pub fn new(manager: ConnectionManager) -> Self {
        tracing::info!("Redis auth store initialized");
        Self { client: manager }
    }
}

#[async_trait]
impl TokenStore for RedisAuthStore {
    async fn whitelist(&self, jti: &str, user_id: &str, ttl_seconds: u64) -> Result<(), AuthError> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(whitelist_key(jti), user_id, ttl_seconds)
            .await?;
        Ok(())
    }

    async fn is_whitelisted(&self, jti: &str) -> Result<bool, AuthError> {
        let mut conn = self.client.clone();
        Ok(conn.exists(whitelist_key(jti)).await?)
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> Result<(), AuthError> {
        let mut conn = self.client.clone();
        conn.set_ex::<_, _, ()>(blacklist_key(jti), "1", ttl_seconds)
            .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        let mut conn = self.client.clone();
        Ok(conn.exists(blacklist_key(jti)).await?)
    }

    async fn revoke(&self, jti: &str) -> Result<(), AuthError> {
        let mut conn = self.client.clone();
        conn.del::<_, ()>(whitelist_key(jti)).await?;
        Ok(())
    }
}

/// Process-local token store for tests and single-node development.
#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn put(&self, key: String, ttl_seconds: u64) {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries.write().await.insert(key, expires);
    }

    async fn live(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|expires| *expires > Instant::now())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn whitelist(&self, jti: &str, _user_id: &str, ttl_seconds: u64) -> Result<(), AuthError> {
        self.put(whitelist_key(jti), ttl_seconds).await;
        Ok(())
    }

    async fn is_whitelisted(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self.live(&whitelist_key(jti)).await)
    }

    async fn blacklist(&self, jti: &str, ttl_seconds: u64) -> Result<(), AuthError> {
        self.put(blacklist_key(jti), ttl_seconds).await;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, AuthError> {
        Ok(self.live(&blacklist_key(jti)).await)
    }

    async fn revoke(&self, jti: &str) -> Result<(), AuthError> {
        self.entries.write().await.remove(&whitelist_key(jti));
        Ok(())
    }
}
