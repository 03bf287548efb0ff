//! Route policy for every `/api` endpoint.
//!
//! Paths are the full request paths as seen by the outer router. A route
//! missing here is denied by `authorize`, so new handlers must be added.

use axum::http::Method;
use axum_helpers::{PolicyTable, Requirement};

const PATIENTS_READ: Requirement = Requirement::Ability("patients.read");
const PATIENTS_WRITE: Requirement = Requirement::Ability("patients.write");
const PATIENTS_AUDIT: Requirement = Requirement::Ability("patients.audit");
const VISITES_READ: Requirement = Requirement::Ability("visites.read");
const VISITES_WRITE: Requirement = Requirement::Ability("visites.write");
const PHARMACY_READ: Requirement = Requirement::Ability("pharmacy.read");
const PHARMACY_WRITE: Requirement = Requirement::Ability("pharmacy.write");
const PHARMACY_SELL: Requirement = Requirement::Ability("pharmacy.sell");
const USERS_ADMIN: Requirement = Requirement::RoleAndAbility {
    role: "admin",
    ability: "users.manage",
};

pub fn policy_table() -> PolicyTable {
    PolicyTable::new()
        // Session
        .route(Method::POST, "/api/v1/auth/login", Requirement::Public)
        .route(Method::POST, "/api/v1/auth/logout", Requirement::Authenticated)
        .route(Method::GET, "/api/v1/auth/me", Requirement::Authenticated)
        // Patients
        .route(Method::GET, "/api/v1/patients", PATIENTS_READ)
        .route(Method::POST, "/api/v1/patients", PATIENTS_WRITE)
        .route(Method::GET, "/api/v1/patients/{id}", PATIENTS_READ)
        .route(Method::PATCH, "/api/v1/patients/{id}", PATIENTS_WRITE)
        .route(Method::DELETE, "/api/v1/patients/{id}", PATIENTS_WRITE)
        .route(Method::POST, "/api/v1/patients/{id}/restore", PATIENTS_WRITE)
        .route(Method::GET, "/api/v1/patients/{id}/history", PATIENTS_AUDIT)
        // Visits
        .route(Method::GET, "/api/v1/visites", VISITES_READ)
        .route(Method::POST, "/api/v1/visites", VISITES_WRITE)
        .route(Method::GET, "/api/v1/visites/{id}", VISITES_READ)
        .route(Method::PATCH, "/api/v1/visites/{id}", VISITES_WRITE)
        // Administration
        .route(Method::GET, "/api/v1/admin/users", USERS_ADMIN)
        .route(Method::POST, "/api/v1/admin/users", USERS_ADMIN)
        // Pharmacy catalog and stock
        .route(Method::GET, "/api/v1/pharmacy/articles", PHARMACY_READ)
        .route(Method::POST, "/api/v1/pharmacy/articles", PHARMACY_WRITE)
        .route(Method::GET, "/api/v1/pharmacy/articles/{id}", PHARMACY_READ)
        .route(Method::PATCH, "/api/v1/pharmacy/articles/{id}", PHARMACY_WRITE)
        .route(Method::GET, "/api/v1/pharmacy/dcis", PHARMACY_READ)
        .route(Method::GET, "/api/v1/pharmacy/lots", PHARMACY_READ)
        .route(Method::POST, "/api/v1/pharmacy/lots", PHARMACY_WRITE)
        .route(Method::PATCH, "/api/v1/pharmacy/lots/{id}", PHARMACY_WRITE)
        .route(Method::DELETE, "/api/v1/pharmacy/lots/{id}", PHARMACY_WRITE)
        // Counter sales
        .route(Method::GET, "/api/v1/pharmacy/cart", PHARMACY_SELL)
        .route(Method::DELETE, "/api/v1/pharmacy/cart", PHARMACY_SELL)
        .route(Method::POST, "/api/v1/pharmacy/cart/items", PHARMACY_SELL)
        .route(Method::DELETE, "/api/v1/pharmacy/cart/items/{id}", PHARMACY_SELL)
        .route(Method::POST, "/api/v1/pharmacy/cart/checkout", PHARMACY_SELL)
        .route(Method::GET, "/api/v1/pharmacy/sales/{id}", PHARMACY_READ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_route_once() {
        let table = policy_table();
        assert_eq!(table.routes().len(), 31);

        let mut seen = std::collections::HashSet::new();
        for policy in table.routes() {
            assert!(
                seen.insert((policy.method.clone(), policy.path)),
                "duplicate policy for {} {}",
                policy.method,
                policy.path
            );
            assert!(policy.path.starts_with("/api/v1/"));
        }
    }

    #[test]
    fn test_lookup_matches_path_parameters() {
        let table = policy_table();
        assert_eq!(
            table.lookup(&Method::GET, "/api/v1/patients/0192f0c4-7d35-7000-8000-000000000001/history"),
            Some(PATIENTS_AUDIT)
        );
        assert_eq!(
            table.lookup(&Method::DELETE, "/api/v1/pharmacy/cart/items/42"),
            Some(PHARMACY_SELL)
        );
        assert_eq!(
            table.lookup(&Method::POST, "/api/v1/auth/login"),
            Some(Requirement::Public)
        );
    }

    #[test]
    fn test_unlisted_routes_have_no_policy() {
        let table = policy_table();
        assert_eq!(table.lookup(&Method::PUT, "/api/v1/patients/1"), None);
        assert_eq!(table.lookup(&Method::DELETE, "/api/v1/pharmacy/sales/1"), None);
        assert_eq!(table.lookup(&Method::GET, "/api/v1/unknown"), None);
    }
}
