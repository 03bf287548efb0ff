use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    QueryFilter, Statement,
};
use uuid::Uuid;

use crate::entity;
use crate::error::{UserError, UserResult};
use crate::models::{User, UserFilter};
use crate::repository::UserRepository;

/// PostgreSQL implementation of UserRepository using SeaORM
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

const FILTER_WHERE: &str = r#"
    WHERE ($1::TEXT IS NULL OR email ILIKE $1 OR name ILIKE $1)
      AND ($2::TEXT IS NULL OR $2 = ANY(roles))
"#;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

fn filter_values(filter: &UserFilter) -> (Option<String>, Option<String>) {
    let pattern = filter.search.as_ref().map(|s| format!("%{}%", s.trim()));
    let role = filter.role.map(|r| r.to_string());
    (pattern, role)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> UserResult<User> {
        let email = user.email.clone();
        let active: entity::ActiveModel = user.into();

        let model = active.insert(&self.db).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("duplicate key") || message.contains("unique constraint") {
                UserError::DuplicateEmail(email.clone())
            } else {
                UserError::from(e)
            }
        })?;

        tracing::info!(user_id = %model.id, email = %model.email, "Created user");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = entity::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(User::from))
    }

    async fn get_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?;
        Ok(model.map(User::from))
    }

    async fn list(&self, filter: UserFilter) -> UserResult<Vec<User>> {
        let (pattern, role) = filter_values(&filter);
        let sql = format!(
            "SELECT id, email, name, password_hash, roles, abilities, created_at, updated_at \
             FROM users {FILTER_WHERE} ORDER BY email LIMIT $3 OFFSET $4"
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                pattern.into(),
                role.into(),
                (filter.limit as i64).into(),
                (filter.offset as i64).into(),
            ],
        );

        let users = entity::Model::find_by_statement(stmt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(User::from)
            .collect();
        Ok(users)
    }

    async fn count(&self, filter: UserFilter) -> UserResult<u64> {
        let (pattern, role) = filter_values(&filter);
        let sql = format!("SELECT COUNT(*)::BIGINT AS total FROM users {FILTER_WHERE}");
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [pattern.into(), role.into()]);

        let row = CountRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map(|r| r.total.max(0) as u64).unwrap_or(0))
    }
}
