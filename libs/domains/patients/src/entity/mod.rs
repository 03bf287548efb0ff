//! SeaORM entities for the clinical tables.

pub mod patient;
pub mod patient_history;
pub mod visit;
