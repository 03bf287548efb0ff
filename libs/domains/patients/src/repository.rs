use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PatientError, PatientResult};
use crate::models::{Patient, PatientFilter, PatientHistoryEntry, Visit, VisitFilter};

/// Persistence for patients, their history and visits.
///
/// A patient write and its history entry are stored together or not at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Patients ordered by last name, first name; deleted ones only on request.
    async fn list_patients(&self, filter: PatientFilter) -> PatientResult<Vec<Patient>>;

    async fn count_patients(&self, filter: PatientFilter) -> PatientResult<u64>;

    /// Any patient, deleted or not.
    async fn get_patient(&self, id: Uuid) -> PatientResult<Option<Patient>>;

    async fn insert_patient(&self, patient: Patient, entry: PatientHistoryEntry) -> PatientResult<Patient>;

    /// Replace the stored patient (including `deleted_at`) and append the entry.
    async fn update_patient(&self, patient: Patient, entry: PatientHistoryEntry) -> PatientResult<Patient>;

    /// History oldest first.
    async fn history(&self, patient_id: Uuid) -> PatientResult<Vec<PatientHistoryEntry>>;

    /// Visits, most recent first.
    async fn list_visits(&self, filter: VisitFilter) -> PatientResult<Vec<Visit>>;

    async fn count_visits(&self, filter: VisitFilter) -> PatientResult<u64>;

    async fn get_visit(&self, id: Uuid) -> PatientResult<Option<Visit>>;

    async fn insert_visit(&self, visit: Visit) -> PatientResult<Visit>;

    async fn update_visit(&self, visit: Visit) -> PatientResult<Visit>;
}

#[derive(Debug, Default)]
struct Store {
    patients: HashMap<Uuid, Patient>,
    history: Vec<PatientHistoryEntry>,
    visits: HashMap<Uuid, Visit>,
}

/// In-memory implementation of PatientRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryPatientRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn patient_matches(patient: &Patient, filter: &PatientFilter) -> bool {
        if patient.is_deleted() && !filter.include_deleted {
            return false;
        }
        filter.search.as_deref().is_none_or(|term| {
            let term = term.trim().to_lowercase();
            [
                Some(&patient.first_name),
                Some(&patient.last_name),
                patient.phone.as_ref(),
                patient.email.as_ref(),
            ]
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&term))
        })
    }

    fn visit_matches(visit: &Visit, filter: &VisitFilter) -> bool {
        filter.patient_id.is_none_or(|id| visit.patient_id == id)
            && filter.status.is_none_or(|status| visit.status == status)
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn list_patients(&self, filter: PatientFilter) -> PatientResult<Vec<Patient>> {
        let store = self.store.read().await;
        let mut patients: Vec<Patient> = store
            .patients
            .values()
            .filter(|p| Self::patient_matches(p, &filter))
            .cloned()
            .collect();

        patients.sort_by(|a, b| {
            a.last_name
                .to_lowercase()
                .cmp(&b.last_name.to_lowercase())
                .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
                .then(a.id.cmp(&b.id))
        });

        Ok(patients
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count_patients(&self, filter: PatientFilter) -> PatientResult<u64> {
        let store = self.store.read().await;
        Ok(store
            .patients
            .values()
            .filter(|p| Self::patient_matches(p, &filter))
            .count() as u64)
    }

    async fn get_patient(&self, id: Uuid) -> PatientResult<Option<Patient>> {
        let store = self.store.read().await;
        Ok(store.patients.get(&id).cloned())
    }

    async fn insert_patient(&self, patient: Patient, entry: PatientHistoryEntry) -> PatientResult<Patient> {
        let mut store = self.store.write().await;
        store.patients.insert(patient.id, patient.clone());
        store.history.push(entry);

        tracing::info!(patient_id = %patient.id, "Created patient");
        Ok(patient)
    }

    async fn update_patient(&self, patient: Patient, entry: PatientHistoryEntry) -> PatientResult<Patient> {
        let mut store = self.store.write().await;
        if !store.patients.contains_key(&patient.id) {
            return Err(PatientError::PatientNotFound(patient.id));
        }
        store.patients.insert(patient.id, patient.clone());
        store.history.push(entry);
        Ok(patient)
    }

    async fn history(&self, patient_id: Uuid) -> PatientResult<Vec<PatientHistoryEntry>> {
        let store = self.store.read().await;
        Ok(store
            .history
            .iter()
            .filter(|e| e.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn list_visits(&self, filter: VisitFilter) -> PatientResult<Vec<Visit>> {
        let store = self.store.read().await;
        let mut visits: Vec<Visit> = store
            .visits
            .values()
            .filter(|v| Self::visit_matches(v, &filter))
            .cloned()
            .collect();

        visits.sort_by(|a, b| b.visited_at.cmp(&a.visited_at).then(b.id.cmp(&a.id)));

        Ok(visits
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count_visits(&self, filter: VisitFilter) -> PatientResult<u64> {
        let store = self.store.read().await;
        Ok(store
            .visits
            .values()
            .filter(|v| Self::visit_matches(v, &filter))
            .count() as u64)
    }

    async fn get_visit(&self, id: Uuid) -> PatientResult<Option<Visit>> {
        let store = self.store.read().await;
        Ok(store.visits.get(&id).cloned())
    }

    async fn insert_visit(&self, visit: Visit) -> PatientResult<Visit> {
        let mut store = self.store.write().await;
        if !store.patients.contains_key(&visit.patient_id) {
            return Err(PatientError::PatientNotFound(visit.patient_id));
        }
        store.visits.insert(visit.id, visit.clone());

        tracing::info!(visit_id = %visit.id, patient_id = %visit.patient_id, "Created visit");
        Ok(visit)
    }

    async fn update_visit(&self, visit: Visit) -> PatientResult<Visit> {
        let mut store = self.store.write().await;
        if !store.visits.contains_key(&visit.id) {
            return Err(PatientError::VisitNotFound(visit.id));
        }
        store.visits.insert(visit.id, visit.clone());
        Ok(visit)
    }
}
