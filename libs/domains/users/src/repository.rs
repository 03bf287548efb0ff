use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{User, UserFilter};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user; the email must be unused
    async fn create(&self, user: User) -> UserResult<User>;

    /// Get a user by ID
    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    /// Get a user by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// List users ordered by email, paged by `filter.limit`/`filter.offset`
    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>>;

    /// Count users matching the filter, ignoring paging
    async fn count(&self, filter: UserFilter) -> UserResult<u64>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(user: &User, filter: &UserFilter) -> bool {
        let search_ok = filter.search.as_deref().is_none_or(|term| {
            let term = term.to_lowercase();
            user.email.contains(&term) || user.name.to_lowercase().contains(&term)
        });
        let role_ok = filter.role.is_none_or(|role| user.roles.contains(&role));
        search_ok && role_ok
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, email = %user.email, "Created user");
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users
            .values()
            .filter(|u| Self::matches(u, &filter))
            .cloned()
            .collect();

        result.sort_by(|a, b| a.email.cmp(&b.email));

        Ok(result
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| Self::matches(u, &filter)).count() as u64)
    }
}
