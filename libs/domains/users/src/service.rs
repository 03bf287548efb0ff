use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum_helpers::{IssuedToken, JwtAuth, JwtClaims, TokenSubject};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{
    CreateUser, LoginRequest, TokenResponse, User, UserFilter, UserPage, UserResponse,
    abilities_for,
};
use crate::repository::UserRepository;

const MAX_PAGE_SIZE: u64 = 200;

/// Service layer for staff user management
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a user with a hashed password. Abilities default to the
    /// union of the roles' abilities.
    pub async fn create_user(&self, input: CreateUser) -> UserResult<UserResponse> {
        input.validate()?;

        let password_hash = hash_password(&input.password)?;
        let abilities = input
            .abilities
            .unwrap_or_else(|| abilities_for(&input.roles));

        let user = User::new(input.email, input.name, password_hash, input.roles, abilities);
        let created = self.repository.create(user).await?;
        Ok(created.into())
    }

    pub async fn get_user(&self, id: Uuid) -> UserResult<UserResponse> {
        let user = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        Ok(user.into())
    }

    pub async fn list_users(&self, mut filter: UserFilter) -> UserResult<UserPage> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let (limit, offset) = (filter.limit, filter.offset);

        let total = self.repository.count(filter.clone()).await?;
        let users = self.repository.list(filter).await?;

        Ok(UserPage {
            data: users.into_iter().map(UserResponse::from).collect(),
            total,
            limit,
            offset,
        })
    }

    /// Check an email/password pair. Unknown email and wrong password are
    /// the same error.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> UserResult<User> {
        let user = self
            .repository
            .get_by_email(email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(UserError::InvalidCredentials);
        }

        Ok(user)
    }
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash string
pub fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Login, logout and current-user lookups on top of [`UserService`]
pub struct AuthService<R: UserRepository> {
    users: UserService<R>,
    jwt: JwtAuth,
}

impl<R: UserRepository> Clone for AuthService<R> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            jwt: self.jwt.clone(),
        }
    }
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(users: UserService<R>, jwt: JwtAuth) -> Self {
        Self { users, jwt }
    }

    /// Verify credentials and issue a whitelisted access token carrying the
    /// user's roles and abilities.
    pub async fn login(&self, input: LoginRequest) -> UserResult<TokenResponse> {
        input.validate()?;

        let user = self
            .users
            .verify_credentials(&input.email, &input.password)
            .await?;

        let roles = user.role_names();
        let IssuedToken {
            token, expires_in, ..
        } = self
            .jwt
            .issue_access_token(TokenSubject {
                user_id: user.id,
                email: &user.email,
                name: &user.name,
                roles: &roles,
                abilities: &user.abilities,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in,
            user: user.into(),
        })
    }

    /// Revoke the token the claims were read from.
    pub async fn logout(&self, claims: &JwtClaims) -> UserResult<()> {
        self.jwt.revoke(claims).await?;
        tracing::info!(user_id = %claims.sub, jti = %claims.jti, "User logged out");
        Ok(())
    }

    /// The user behind the claims, as currently stored.
    pub async fn me(&self, claims: &JwtClaims) -> UserResult<UserResponse> {
        let id = claims.user_id()?;
        self.users.get_user(id).await
    }
}
