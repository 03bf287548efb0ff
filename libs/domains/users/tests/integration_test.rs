//! PostgreSQL repository tests for the Users domain.
//!
//! Run with `cargo test -p domain_users -- --ignored` (requires Docker).

use domain_users::*;
use test_utils::{TestDataBuilder, TestDatabase};

fn user(email: String, roles: Vec<Role>) -> User {
    let abilities = abilities_for(&roles);
    User::new(email, "Staff".into(), hash_password("s3cretpass").unwrap(), roles, abilities)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_roles_and_abilities_round_trip() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_user_roles");

    let created = repo
        .create(user(builder.email("pharma"), vec![Role::Pharmacist, Role::Receptionist]))
        .await
        .unwrap();

    let loaded = repo.get_by_email(&created.email.to_uppercase()).await.unwrap().unwrap();
    assert_eq!(loaded.roles, vec![Role::Pharmacist, Role::Receptionist]);
    assert!(loaded.abilities.contains(&"pharmacy.sell".to_string()));
    assert!(verify_password("s3cretpass", &loaded.password_hash).unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_duplicate_email_maps_to_conflict() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_user_duplicate");

    repo.create(user(builder.email("dup"), vec![Role::Admin])).await.unwrap();
    let result = repo.create(user(builder.email("dup"), vec![Role::Admin])).await;

    assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_filters_by_role() {
    let db = TestDatabase::new().await;
    let repo = PgUserRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_user_list");

    repo.create(user(builder.email("a"), vec![Role::Clinician])).await.unwrap();
    repo.create(user(builder.email("b"), vec![Role::Pharmacist])).await.unwrap();

    let filter = UserFilter {
        role: Some(Role::Clinician),
        search: Some(builder.email("a")),
        ..UserFilter::default()
    };
    assert_eq!(repo.count(filter.clone()).await.unwrap(), 1);
    let users = repo.list(filter).await.unwrap();
    assert_eq!(users[0].roles, vec![Role::Clinician]);
}
