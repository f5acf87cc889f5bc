//! Database migrations for the model catalog.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_02_090000_create_providers;
mod m2025_06_02_090100_create_models;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_02_090000_create_providers::Migration),
            Box::new(m2025_06_02_090100_create_models::Migration),
        ]
    }
}
