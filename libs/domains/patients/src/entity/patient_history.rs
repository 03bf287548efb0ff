use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use std::str::FromStr;

use crate::error::PatientError;
use crate::models::{HistoryAction, PatientHistoryEntry};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "patient_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub patient_id: Uuid,
    pub action: String,
    pub actor_id: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary")]
    pub changes: Json,
    pub at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PatientHistoryEntry {
    type Error = PatientError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let action = HistoryAction::from_str(&model.action).map_err(|_| {
            PatientError::Internal(format!("Unknown history action '{}'", model.action))
        })?;

        Ok(Self {
            id: model.id,
            patient_id: model.patient_id,
            action,
            actor_id: model.actor_id,
            changes: model.changes,
            at: model.at.into(),
        })
    }
}

impl From<PatientHistoryEntry> for ActiveModel {
    fn from(entry: PatientHistoryEntry) -> Self {
        ActiveModel {
            id: Set(entry.id),
            patient_id: Set(entry.patient_id),
            action: Set(entry.action.to_string()),
            actor_id: Set(entry.actor_id),
            changes: Set(entry.changes),
            at: Set(entry.at.into()),
        }
    }
}
