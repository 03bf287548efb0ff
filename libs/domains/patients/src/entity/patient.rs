use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use std::str::FromStr;

use crate::models::{Patient, Sex};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "patients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<Date>,
    pub sex: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Patient {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            birth_date: model.birth_date,
            sex: model.sex.as_deref().and_then(|s| Sex::from_str(s).ok()),
            phone: model.phone,
            email: model.email,
            address: model.address,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            deleted_at: model.deleted_at.map(Into::into),
        }
    }
}

impl From<Patient> for ActiveModel {
    fn from(patient: Patient) -> Self {
        ActiveModel {
            id: Set(patient.id),
            first_name: Set(patient.first_name),
            last_name: Set(patient.last_name),
            birth_date: Set(patient.birth_date),
            sex: Set(patient.sex.map(|s| s.to_string())),
            phone: Set(patient.phone),
            email: Set(patient.email),
            address: Set(patient.address),
            created_at: Set(patient.created_at.into()),
            updated_at: Set(patient.updated_at.into()),
            deleted_at: Set(patient.deleted_at.map(Into::into)),
        }
    }
}
