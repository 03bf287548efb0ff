use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use std::str::FromStr;

use crate::models::{Visit, VisitStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "visits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub patient_id: Uuid,
    pub visited_at: DateTimeWithTimeZone,
    pub reason: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub status: String,
    pub practitioner_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Visit {
    fn from(model: Model) -> Self {
        let status = VisitStatus::from_str(&model.status).unwrap_or_else(|_| {
            tracing::warn!(visit_id = %model.id, status = %model.status, "Unknown visit status");
            VisitStatus::default()
        });

        Self {
            id: model.id,
            patient_id: model.patient_id,
            visited_at: model.visited_at.into(),
            reason: model.reason,
            notes: model.notes,
            status,
            practitioner_id: model.practitioner_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<Visit> for ActiveModel {
    fn from(visit: Visit) -> Self {
        ActiveModel {
            id: Set(visit.id),
            patient_id: Set(visit.patient_id),
            visited_at: Set(visit.visited_at.into()),
            reason: Set(visit.reason),
            notes: Set(visit.notes),
            status: Set(visit.status.to_string()),
            practitioner_id: Set(visit.practitioner_id),
            created_at: Set(visit.created_at.into()),
            updated_at: Set(visit.updated_at.into()),
        }
    }
}
