//! First administrator for a fresh database.

use domain_users::{CreateUser, Role, UserFilter, UserRepository, UserResult, UserService};
use tracing::info;

use crate::config::BootstrapAdmin;

/// Creates the configured administrator when no user exists yet.
///
/// Returns `true` when an account was created.
pub async fn ensure_admin<R: UserRepository>(
    users: &UserService<R>,
    admin: &BootstrapAdmin,
) -> UserResult<bool> {
    let existing = users
        .list_users(UserFilter {
            limit: 1,
            ..UserFilter::default()
        })
        .await?;
    if existing.total > 0 {
        return Ok(false);
    }

    let created = users
        .create_user(CreateUser {
            email: admin.email.clone(),
            name: "Administrator".to_string(),
            password: admin.password.clone(),
            roles: vec![Role::Admin],
            abilities: None,
        })
        .await?;
    info!(user_id = %created.id, email = %created.email, "Bootstrap administrator created");
    Ok(true)
}
