use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use std::str::FromStr;

use crate::models::{Role, User};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub abilities: Vec<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        let roles = model
            .roles
            .iter()
            .filter_map(|name| match Role::from_str(name) {
                Ok(role) => Some(role),
                Err(_) => {
                    tracing::warn!(user_id = %model.id, role = %name, "Ignoring unknown role");
                    None
                }
            })
            .collect();

        User {
            id: model.id,
            email: model.email,
            name: model.name,
            password_hash: model.password_hash,
            roles,
            abilities: model.abilities,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<User> for ActiveModel {
    fn from(user: User) -> Self {
        let roles = user.role_names();
        ActiveModel {
            id: Set(user.id),
            email: Set(user.email),
            name: Set(user.name),
            password_hash: Set(user.password_hash),
            roles: Set(roles),
            abilities: Set(user.abilities),
            created_at: Set(user.created_at.into()),
            updated_at: Set(user.updated_at.into()),
        }
    }
}
