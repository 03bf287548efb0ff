//! Patients Domain
//!
//! Patient registry with soft delete, restore and a per-patient change
//! history, plus the visits ("visites") recorded against live patients.
//!
//! Every patient write appends a [`models::PatientHistoryEntry`] in the same
//! repository call, so a record and its history never diverge.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_patients::{InMemoryPatientRepository, PatientService, VisitService};
//! use std::sync::Arc;
//!
//! let repo = Arc::new(InMemoryPatientRepository::new());
//! let patients = domain_patients::handlers::router(PatientService::new(Arc::clone(&repo)));
//! let visits = domain_patients::visit_handlers::visits_router(VisitService::new(repo));
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validation;
pub mod visit_handlers;

pub use error::{PatientError, PatientResult};
pub use handlers::ApiDoc;
pub use models::{
    CreatePatient, CreateVisit, HistoryAction, Patient, PatientFilter, PatientHistoryEntry,
    PatientPage, Sex, UpdatePatient, UpdateVisit, Visit, VisitFilter, VisitPage, VisitStatus,
};
pub use postgres::PgPatientRepository;
pub use repository::{InMemoryPatientRepository, PatientRepository};
pub use service::{PatientService, VisitService};
pub use visit_handlers::VisitApiDoc;
