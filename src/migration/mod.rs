//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_agencies;
mod m20261001_000002_create_businesses;
mod m20261001_000003_create_applications;
mod m20261001_000004_create_application_children;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_agencies::Migration),
            Box::new(m20261001_000002_create_businesses::Migration),
            Box::new(m20261001_000003_create_applications::Migration),
            Box::new(m20261001_000004_create_application_children::Migration),
        ]
    }
}
