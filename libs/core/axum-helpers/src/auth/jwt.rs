use super::config::JwtConfig;
use super::error::AuthError;
use super::store::TokenStore;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Default access token lifetime: 15 minutes
pub const ACCESS_TOKEN_TTL: i64 = 900;

/// Grants every ability when present in a token's ability list
pub const WILDCARD_ABILITY: &str = "*";

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,            // Subject (user ID)
    pub email: String,          // User email
    pub name: String,           // User name
    pub roles: Vec<String>,     // User roles
    pub abilities: Vec<String>, // Fine-grained permissions, "*" for all
    pub exp: i64,               // Expiration time
    pub iat: i64,               // Issued at
    pub jti: String,            // JWT ID (for whitelist/blacklist)
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidSubject)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// `*` grants everything; `pharmacy.*` grants every `pharmacy.` ability.
    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities.iter().any(|granted| {
            granted == WILDCARD_ABILITY
                || granted == ability
                || granted
                    .strip_suffix('*')
                    .is_some_and(|prefix| prefix.ends_with('.') && ability.starts_with(prefix))
        })
    }

    /// Seconds until expiry, floored at zero.
    pub fn remaining_ttl(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(0) as u64
    }
}

/// A signed access token together with its decoded claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
    pub expires_in: i64,
}

/// Who a token is issued to.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub email: &'a str,
    pub name: &'a str,
    pub roles: &'a [String],
    pub abilities: &'a [String],
}

/// Stateless JWT tokens backed by a whitelist/blacklist [`TokenStore`]
#[derive(Clone)]
pub struct JwtAuth {
    secret: String,
    access_ttl_secs: i64,
    store: Arc<dyn TokenStore>,
}

impl JwtAuth {
    /// # Example
    /// ```ignore
    /// let config = JwtConfig::from_env()?;
    /// let auth = JwtAuth::new(Arc::new(RedisAuthStore::new(redis_manager)), &config);
    /// ```
    pub fn new(store: Arc<dyn TokenStore>, config: &JwtConfig) -> Self {
        tracing::info!(access_ttl_secs = config.access_ttl_secs, "JWT auth initialized");
        Self {
            secret: config.secret.clone(),
            access_ttl_secs: config.access_ttl_secs,
            store,
        }
    }

    /// Sign an access token and whitelist its `jti`.
    pub async fn issue_access_token(&self, subject: TokenSubject<'_>) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: subject.user_id.to_string(),
            email: subject.email.to_string(),
            name: subject.name.to_string(),
            roles: subject.roles.to_vec(),
            abilities: subject.abilities.to_vec(),
            exp: (now + Duration::seconds(self.access_ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;

        self.store
            .whitelist(&claims.jti, &claims.sub, self.access_ttl_secs.max(0) as u64)
            .await?;

        Ok(IssuedToken {
            token,
            claims,
            expires_in: self.access_ttl_secs,
        })
    }

    /// Verify JWT signature and expiry, then decode claims
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!("JWT verification failed: {}", e);
            AuthError::InvalidToken
        })?;

        Ok(token_data.claims)
    }

    /// Full check: signature, blacklist, whitelist.
    pub async fn authenticate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let claims = self.verify_token(token)?;

        if self.store.is_blacklisted(&claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Token is blacklisted");
            return Err(AuthError::Revoked);
        }
        if !self.store.is_whitelisted(&claims.jti).await? {
            tracing::debug!(jti = %claims.jti, "Token is not whitelisted");
            return Err(AuthError::NotWhitelisted);
        }

        Ok(claims)
    }

    /// Logout: drop from the whitelist and blacklist for the remaining lifetime.
    pub async fn revoke(&self, claims: &JwtClaims) -> Result<(), AuthError> {
        self.store.revoke(&claims.jti).await?;
        self.store.blacklist(&claims.jti, claims.remaining_ttl()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{InMemoryTokenStore, MockTokenStore};

    const SECRET: &str = "test-secret-key-that-is-at-least-32-chars";

    fn auth_with(store: Arc<dyn TokenStore>) -> JwtAuth {
        JwtAuth::new(store, &JwtConfig::new(SECRET).unwrap())
    }

    fn subject<'a>(roles: &'a [String], abilities: &'a [String]) -> TokenSubject<'a> {
        TokenSubject {
            user_id: Uuid::nil(),
            email: "pharma@clinic.test",
            name: "Pharma",
            roles,
            abilities,
        }
    }

    #[tokio::test]
    async fn test_issue_then_authenticate() {
        let auth = auth_with(Arc::new(InMemoryTokenStore::new()));
        let roles = vec!["pharmacist".to_string()];
        let abilities = vec!["pharmacy.sell".to_string()];

        let issued = auth.issue_access_token(subject(&roles, &abilities)).await.unwrap();
        let claims = auth.authenticate(&issued.token).await.unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.user_id().unwrap(), Uuid::nil());
        assert!(claims.has_ability("pharmacy.sell"));
        assert!(!claims.has_ability("pharmacy.write"));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let auth = auth_with(Arc::new(InMemoryTokenStore::new()));
        let issued = auth.issue_access_token(subject(&[], &[])).await.unwrap();

        auth.revoke(&issued.claims).await.unwrap();

        let err = auth.authenticate(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::Revoked));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_invalid() {
        let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        let issuer = auth_with(store.clone());
        let other = JwtAuth::new(store, &JwtConfig::new("another-secret-that-is-also-32-chars-long").unwrap());

        let issued = issuer.issue_access_token(subject(&[], &[])).await.unwrap();
        assert!(matches!(other.authenticate(&issued.token).await, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_error() {
        let mut store = MockTokenStore::new();
        store
            .expect_whitelist()
            .returning(|_, _, _| Err(AuthError::Store("connection refused".into())));

        let auth = auth_with(Arc::new(store));
        let err = auth.issue_access_token(subject(&[], &[])).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[test]
    fn test_ability_wildcards() {
        let claims = JwtClaims {
            sub: Uuid::nil().to_string(),
            email: String::new(),
            name: String::new(),
            roles: vec!["admin".into()],
            abilities: vec!["patients.*".into()],
            exp: 0,
            iat: 0,
            jti: String::new(),
        };
        assert!(claims.has_ability("patients.audit"));
        assert!(!claims.has_ability("pharmacy.read"));
        assert!(claims.has_role("admin"));

        let admin = JwtClaims {
            abilities: vec![WILDCARD_ABILITY.into()],
            ..claims
        };
        assert!(admin.has_ability("users.manage"));
    }
}
