use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::{patient, patient_history, visit};
use crate::error::{PatientError, PatientResult};
use crate::models::{Patient, PatientFilter, PatientHistoryEntry, Visit, VisitFilter};
use crate::repository::PatientRepository;

/// PostgreSQL implementation of PatientRepository using SeaORM
#[derive(Clone)]
pub struct PgPatientRepository {
    db: DatabaseConnection,
}

impl PgPatientRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

const PATIENT_WHERE: &str = r#"
    WHERE ($1::BOOLEAN OR deleted_at IS NULL)
      AND ($2::TEXT IS NULL
           OR first_name ILIKE $2 OR last_name ILIKE $2
           OR phone ILIKE $2 OR email ILIKE $2)
"#;

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

fn search_pattern(filter: &PatientFilter) -> Option<String> {
    filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

fn visit_query(filter: &VisitFilter) -> Select<visit::Entity> {
    let mut query = visit::Entity::find();
    if let Some(patient_id) = filter.patient_id {
        query = query.filter(visit::Column::PatientId.eq(patient_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(visit::Column::Status.eq(status.to_string()));
    }
    query
}

#[async_trait]
impl PatientRepository for PgPatientRepository {
    async fn list_patients(&self, filter: PatientFilter) -> PatientResult<Vec<Patient>> {
        let sql = format!(
            "SELECT * FROM patients {PATIENT_WHERE} \
             ORDER BY lower(last_name), lower(first_name), id LIMIT $3 OFFSET $4"
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                filter.include_deleted.into(),
                search_pattern(&filter).into(),
                (filter.limit as i64).into(),
                (filter.offset as i64).into(),
            ],
        );

        let patients = patient::Model::find_by_statement(stmt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Patient::from)
            .collect();
        Ok(patients)
    }

    async fn count_patients(&self, filter: PatientFilter) -> PatientResult<u64> {
        let sql = format!("SELECT COUNT(*)::BIGINT AS total FROM patients {PATIENT_WHERE}");
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [filter.include_deleted.into(), search_pattern(&filter).into()],
        );

        let row = CountRow::find_by_statement(stmt).one(&self.db).await?;
        Ok(row.map(|r| r.total.max(0) as u64).unwrap_or(0))
    }

    async fn get_patient(&self, id: Uuid) -> PatientResult<Option<Patient>> {
        let model = patient::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Patient::from))
    }

    async fn insert_patient(&self, patient: Patient, entry: PatientHistoryEntry) -> PatientResult<Patient> {
        let txn = self.db.begin().await?;

        let model = patient::ActiveModel::from(patient).insert(&txn).await?;
        patient_history::ActiveModel::from(entry).insert(&txn).await?;

        txn.commit().await?;

        tracing::info!(patient_id = %model.id, "Created patient");
        Ok(model.into())
    }

    async fn update_patient(&self, patient: Patient, entry: PatientHistoryEntry) -> PatientResult<Patient> {
        let txn = self.db.begin().await?;

        patient::Entity::find_by_id(patient.id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(PatientError::PatientNotFound(patient.id))?;

        let model = patient::ActiveModel::from(patient).update(&txn).await?;
        patient_history::ActiveModel::from(entry).insert(&txn).await?;

        txn.commit().await?;
        Ok(model.into())
    }

    async fn history(&self, patient_id: Uuid) -> PatientResult<Vec<PatientHistoryEntry>> {
        patient_history::Entity::find()
            .filter(patient_history::Column::PatientId.eq(patient_id))
            .order_by_asc(patient_history::Column::At)
            .order_by_asc(patient_history::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(PatientHistoryEntry::try_from)
            .collect()
    }

    async fn list_visits(&self, filter: VisitFilter) -> PatientResult<Vec<Visit>> {
        let visits = visit_query(&filter)
            .order_by_desc(visit::Column::VisitedAt)
            .order_by_desc(visit::Column::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Visit::from)
            .collect();
        Ok(visits)
    }

    async fn count_visits(&self, filter: VisitFilter) -> PatientResult<u64> {
        Ok(visit_query(&filter).count(&self.db).await?)
    }

    async fn get_visit(&self, id: Uuid) -> PatientResult<Option<Visit>> {
        let model = visit::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Visit::from))
    }

    async fn insert_visit(&self, visit: Visit) -> PatientResult<Visit> {
        let patient_id = visit.patient_id;
        let model = visit::ActiveModel::from(visit)
            .insert(&self.db)
            .await
            .map_err(|e| {
                if e.to_string().contains("foreign key") {
                    PatientError::PatientNotFound(patient_id)
                } else {
                    PatientError::from(e)
                }
            })?;

        tracing::info!(visit_id = %model.id, patient_id = %model.patient_id, "Created visit");
        Ok(model.into())
    }

    async fn update_visit(&self, visit: Visit) -> PatientResult<Visit> {
        let id = visit.id;
        if visit::Entity::find_by_id(id).one(&self.db).await?.is_none() {
            return Err(PatientError::VisitNotFound(id));
        }

        let model = visit::ActiveModel::from(visit).update(&self.db).await?;
        Ok(model.into())
    }
}
