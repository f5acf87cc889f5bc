//! Provider repository for database operations
//!
//! This module provides the ProviderRepository struct which encapsulates
//! SeaORM operations for the providers table, keyed by provider name.

use anyhow::{Result, anyhow};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::provider::{self, Entity as Provider};

/// Repository for provider database operations
#[derive(Debug, Clone)]
pub struct ProviderRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ProviderRepository {
    /// Creates a new ProviderRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a provider by its unique name
    ///
    /// # Arguments
    ///
    /// * `name` - The natural key of the provider
    ///
    /// # Returns
    ///
    /// Returns the provider if present, `None` otherwise
    pub async fn find_by_name(&self, name: &str) -> Result<Option<provider::Model>> {
        let provider = Provider::find()
            .filter(provider::Column::Name.eq(name))
            .one(&*self.db)
            .await?;
        Ok(provider)
    }

    /// Finds a provider by its generated identifier
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<provider::Model>> {
        Ok(Provider::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists every persisted provider ordered by name
    pub async fn find_all(&self) -> Result<Vec<provider::Model>> {
        let providers = Provider::find()
            .order_by_asc(provider::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(providers)
    }

    /// Inserts a new provider and returns the persisted row
    ///
    /// The caller supplies the identifier; it is required to re-read the row.
    pub async fn create(&self, provider: provider::ActiveModel) -> Result<provider::Model> {
        let id = provider
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("provider id must be set"))?;

        Provider::insert(provider).exec(&*self.db).await?;

        let fetched = self.find_by_id(id).await?;
        fetched.ok_or_else(|| anyhow!("provider '{}' not persisted", id))
    }

    /// Applies the set fields of `changes` to the provider named `name`
    ///
    /// # Returns
    ///
    /// Returns an error if no row carries that name
    pub async fn update_by_name(&self, name: &str, changes: provider::ActiveModel) -> Result<()> {
        let result = Provider::update_many()
            .set(changes)
            .filter(provider::Column::Name.eq(name))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(anyhow!("Provider with name '{}' not found", name));
        }

        Ok(())
    }
}
