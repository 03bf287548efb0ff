pub use sea_orm_migration::prelude::*;

mod m20250301_000000_bootstrap;
mod m20250301_000001_create_users;
mod m20250301_000002_create_patients;
mod m20250301_000003_create_visits;
mod m20250301_000004_create_pharmacy_catalog;
mod m20250301_000005_create_carts;
mod m20250301_000006_create_sales;
mod m20250301_000007_seed_dcis;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000000_bootstrap::Migration),
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_patients::Migration),
            Box::new(m20250301_000003_create_visits::Migration),
            Box::new(m20250301_000004_create_pharmacy_catalog::Migration),
            Box::new(m20250301_000005_create_carts::Migration),
            Box::new(m20250301_000006_create_sales::Migration),
            Box::new(m20250301_000007_seed_dcis::Migration),
        ]
    }
}
