use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::validation::{
    date_field, required, uuid_field, validate_birth_date, validate_uuid,
};

fn default_limit() -> u64 {
    50
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// Patient record. `deleted_at` is set by a soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply a partial update, returning `{field: {from, to}}` for every
    /// field whose value changed.
    pub fn apply(&mut self, update: PatientChanges) -> Map<String, Value> {
        let mut changes = Map::new();

        fn track<T: PartialEq + Serialize>(
            changes: &mut Map<String, Value>,
            field: &str,
            current: &mut T,
            next: Option<T>,
        ) {
            if let Some(next) = next
                && *current != next
            {
                changes.insert(field.to_string(), json!({ "from": &*current, "to": &next }));
                *current = next;
            }
        }

        track(&mut changes, "first_name", &mut self.first_name, update.first_name);
        track(&mut changes, "last_name", &mut self.last_name, update.last_name);
        track(&mut changes, "birth_date", &mut self.birth_date, update.birth_date.map(Some));
        track(&mut changes, "sex", &mut self.sex, update.sex.map(Some));
        track(&mut changes, "phone", &mut self.phone, update.phone.map(Some));
        track(&mut changes, "email", &mut self.email, update.email.map(Some));
        track(&mut changes, "address", &mut self.address, update.address.map(Some));

        changes
    }
}

/// Body for registering a patient
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePatient {
    #[validate(required, length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(required, length(min = 1, max = 100))]
    pub last_name: Option<String>,
    /// `YYYY-MM-DD`, not in the future
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<String>,
    pub sex: Option<Sex>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(email, length(max = 190))]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

impl CreatePatient {
    pub fn into_patient(self) -> Result<Patient, ValidationErrors> {
        let birth_date = match self.birth_date.as_deref() {
            Some(raw) => Some(date_field(raw, "birth_date")?),
            None => None,
        };
        let now = Utc::now();

        Ok(Patient {
            id: Uuid::now_v7(),
            first_name: required(self.first_name, "first_name")?.trim().to_string(),
            last_name: required(self.last_name, "last_name")?.trim().to_string(),
            birth_date,
            sex: self.sex,
            phone: self.phone,
            email: self.email.map(|e| e.trim().to_lowercase()),
            address: self.address,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }
}

/// Body for a partial patient update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePatient {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_birth_date"))]
    pub birth_date: Option<String>,
    pub sex: Option<Sex>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(email, length(max = 190))]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

/// Validated patient update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl UpdatePatient {
    pub fn into_changes(self) -> Result<PatientChanges, ValidationErrors> {
        let birth_date = match self.birth_date.as_deref() {
            Some(raw) => Some(date_field(raw, "birth_date")?),
            None => None,
        };

        Ok(PatientChanges {
            first_name: self.first_name.map(|s| s.trim().to_string()),
            last_name: self.last_name.map(|s| s.trim().to_string()),
            birth_date,
            sex: self.sex,
            phone: self.phone,
            email: self.email.map(|e| e.trim().to_lowercase()),
            address: self.address,
        })
    }
}

/// Query parameters for listing patients
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct PatientFilter {
    /// Case-insensitive match on names, phone or email
    pub search: Option<String>,
    /// Include soft-deleted patients
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for PatientFilter {
    fn default() -> Self {
        Self {
            search: None,
            include_deleted: false,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientPage {
    pub data: Vec<Patient>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Updated,
    Deleted,
    Restored,
}

/// One audited change to a patient record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientHistoryEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub action: HistoryAction,
    pub actor_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub changes: Value,
    pub at: DateTime<Utc>,
}

impl PatientHistoryEntry {
    pub fn new(patient_id: Uuid, action: HistoryAction, actor_id: Option<Uuid>, changes: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            patient_id,
            action,
            actor_id,
            changes,
            at: Utc::now(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisitStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

/// A patient encounter ("visite")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Visit {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub visited_at: DateTime<Utc>,
    pub reason: String,
    pub notes: Option<String>,
    pub status: VisitStatus,
    pub practitioner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for scheduling or recording a visit
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateVisit {
    #[validate(required, custom(function = "validate_uuid"))]
    pub patient_id: Option<String>,
    /// Defaults to now
    pub visited_at: Option<DateTime<Utc>>,
    #[validate(required, length(min = 1, max = 255))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: VisitStatus,
    #[validate(custom(function = "validate_uuid"))]
    pub practitioner_id: Option<String>,
}

impl CreateVisit {
    /// Build the visit; the patient reference is checked by the service.
    pub fn into_visit(self) -> Result<Visit, ValidationErrors> {
        let patient_id = uuid_field(&required(self.patient_id, "patient_id")?, "patient_id")?;
        let practitioner_id = match self.practitioner_id.as_deref() {
            Some(raw) => Some(uuid_field(raw, "practitioner_id")?),
            None => None,
        };
        let now = Utc::now();

        Ok(Visit {
            id: Uuid::now_v7(),
            patient_id,
            visited_at: self.visited_at.unwrap_or(now),
            reason: required(self.reason, "reason")?,
            notes: self.notes,
            status: self.status,
            practitioner_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Body for a partial visit update
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVisit {
    pub visited_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, max = 255))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub status: Option<VisitStatus>,
    #[validate(custom(function = "validate_uuid"))]
    pub practitioner_id: Option<String>,
}

impl UpdateVisit {
    pub fn apply_to(self, visit: &mut Visit) -> Result<(), ValidationErrors> {
        if let Some(raw) = self.practitioner_id.as_deref() {
            visit.practitioner_id = Some(uuid_field(raw, "practitioner_id")?);
        }
        if let Some(visited_at) = self.visited_at {
            visit.visited_at = visited_at;
        }
        if let Some(reason) = self.reason {
            visit.reason = reason;
        }
        if let Some(notes) = self.notes {
            visit.notes = Some(notes);
        }
        if let Some(status) = self.status {
            visit.status = status;
        }
        visit.updated_at = Utc::now();
        Ok(())
    }
}

/// Query parameters for listing visits
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct VisitFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<VisitStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for VisitFilter {
    fn default() -> Self {
        Self {
            patient_id: None,
            status: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VisitPage {
    pub data: Vec<Visit>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}
