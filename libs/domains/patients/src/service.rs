use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{PatientError, PatientResult};
use crate::models::{
    CreatePatient, CreateVisit, HistoryAction, Patient, PatientFilter, PatientHistoryEntry,
    PatientPage, UpdatePatient, UpdateVisit, Visit, VisitFilter, VisitPage,
};
use crate::repository::PatientRepository;
use crate::validation::exists_error;

const MAX_PAGE_SIZE: u64 = 200;

/// Patient registry with soft delete and a change history
pub struct PatientService<R: PatientRepository> {
    repository: Arc<R>,
}

impl<R: PatientRepository> Clone for PatientService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: PatientRepository> PatientService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn list_patients(&self, mut filter: PatientFilter) -> PatientResult<PatientPage> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let (limit, offset) = (filter.limit, filter.offset);

        let total = self.repository.count_patients(filter.clone()).await?;
        let data = self.repository.list_patients(filter).await?;

        Ok(PatientPage {
            data,
            total,
            limit,
            offset,
        })
    }

    pub async fn create_patient(&self, input: CreatePatient, actor: Option<Uuid>) -> PatientResult<Patient> {
        input.validate()?;
        let patient = input.into_patient()?;

        let snapshot = serde_json::to_value(&patient)
            .map_err(|e| PatientError::Internal(e.to_string()))?;
        let entry = PatientHistoryEntry::new(patient.id, HistoryAction::Created, actor, snapshot);

        self.repository.insert_patient(patient, entry).await
    }

    /// A live patient; deleted ones are reported as missing.
    pub async fn get_patient(&self, id: Uuid) -> PatientResult<Patient> {
        self.repository
            .get_patient(id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or(PatientError::PatientNotFound(id))
    }

    pub async fn update_patient(
        &self,
        id: Uuid,
        input: UpdatePatient,
        actor: Option<Uuid>,
    ) -> PatientResult<Patient> {
        input.validate()?;
        let update = input.into_changes()?;

        let mut patient = self.get_patient(id).await?;
        let changes = patient.apply(update);
        patient.updated_at = Utc::now();

        let entry = PatientHistoryEntry::new(id, HistoryAction::Updated, actor, Value::Object(changes));
        let updated = self.repository.update_patient(patient, entry).await?;

        tracing::info!(patient_id = %id, "Updated patient");
        Ok(updated)
    }

    pub async fn delete_patient(&self, id: Uuid, actor: Option<Uuid>) -> PatientResult<Patient> {
        let mut patient = self.get_patient(id).await?;
        let now = Utc::now();
        patient.deleted_at = Some(now);
        patient.updated_at = now;

        let entry = PatientHistoryEntry::new(
            id,
            HistoryAction::Deleted,
            actor,
            json!({ "deleted_at": now }),
        );
        let deleted = self.repository.update_patient(patient, entry).await?;

        tracing::info!(patient_id = %id, "Soft-deleted patient");
        Ok(deleted)
    }

    /// Undo a soft delete. Restoring a live patient is a conflict.
    pub async fn restore_patient(&self, id: Uuid, actor: Option<Uuid>) -> PatientResult<Patient> {
        let mut patient = self
            .repository
            .get_patient(id)
            .await?
            .ok_or(PatientError::PatientNotFound(id))?;

        let Some(deleted_at) = patient.deleted_at.take() else {
            return Err(PatientError::NotDeleted(id));
        };
        patient.updated_at = Utc::now();

        let entry = PatientHistoryEntry::new(
            id,
            HistoryAction::Restored,
            actor,
            json!({ "deleted_at": { "from": deleted_at, "to": null } }),
        );
        let restored = self.repository.update_patient(patient, entry).await?;

        tracing::info!(patient_id = %id, "Restored patient");
        Ok(restored)
    }

    /// History of any patient, including deleted ones.
    pub async fn history(&self, id: Uuid) -> PatientResult<Vec<PatientHistoryEntry>> {
        if self.repository.get_patient(id).await?.is_none() {
            return Err(PatientError::PatientNotFound(id));
        }
        self.repository.history(id).await
    }
}

/// Visits ("visites") of registered patients
pub struct VisitService<R: PatientRepository> {
    repository: Arc<R>,
}

impl<R: PatientRepository> Clone for VisitService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: PatientRepository> VisitService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn list_visits(&self, mut filter: VisitFilter) -> PatientResult<VisitPage> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let (limit, offset) = (filter.limit, filter.offset);

        let total = self.repository.count_visits(filter.clone()).await?;
        let data = self.repository.list_visits(filter).await?;

        Ok(VisitPage {
            data,
            total,
            limit,
            offset,
        })
    }

    /// The patient must exist and not be deleted.
    pub async fn create_visit(&self, input: CreateVisit) -> PatientResult<Visit> {
        input.validate()?;
        let visit = input.into_visit()?;

        let patient = self.repository.get_patient(visit.patient_id).await?;
        if !patient.is_some_and(|p| !p.is_deleted()) {
            return Err(exists_error("patient_id", visit.patient_id).into());
        }

        self.repository.insert_visit(visit).await
    }

    pub async fn get_visit(&self, id: Uuid) -> PatientResult<Visit> {
        self.repository
            .get_visit(id)
            .await?
            .ok_or(PatientError::VisitNotFound(id))
    }

    pub async fn update_visit(&self, id: Uuid, input: UpdateVisit) -> PatientResult<Visit> {
        input.validate()?;

        let mut visit = self.get_visit(id).await?;
        input.apply_to(&mut visit)?;

        let updated = self.repository.update_visit(visit).await?;
        tracing::info!(visit_id = %id, status = %updated.status, "Updated visit");
        Ok(updated)
    }
}
