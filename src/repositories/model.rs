//! Model repository for database operations
//!
//! This module provides the ModelRepository struct which encapsulates
//! SeaORM operations for the models table. Rows are addressed by their
//! `api_string` natural key.

use anyhow::{Result, anyhow};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::model::{self, Entity as Model};

/// Repository for model database operations
#[derive(Debug, Clone)]
pub struct ModelRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl ModelRepository {
    /// Creates a new ModelRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a model by its api string, regardless of provider
    pub async fn find_by_api_string(&self, api_string: &str) -> Result<Option<model::Model>> {
        let found = Model::find()
            .filter(model::Column::ApiString.eq(api_string))
            .one(&*self.db)
            .await?;
        Ok(found)
    }

    /// Lists all models owned by a provider, ordered by api string
    pub async fn find_by_provider(&self, provider_id: Uuid) -> Result<Vec<model::Model>> {
        let models = Model::find()
            .filter(model::Column::ProviderId.eq(provider_id))
            .order_by_asc(model::Column::ApiString)
            .all(&*self.db)
            .await?;
        Ok(models)
    }

    /// Inserts a new model and returns the persisted row
    pub async fn create(&self, record: model::ActiveModel) -> Result<model::Model> {
        let api_string = record
            .api_string
            .clone()
            .take()
            .ok_or_else(|| anyhow!("model api_string must be set"))?;

        Model::insert(record).exec(&*self.db).await?;

        let fetched = self.find_by_api_string(&api_string).await?;
        fetched.ok_or_else(|| anyhow!("model '{}' not persisted", api_string))
    }

    /// Applies the set fields of `changes` to the model with `api_string`
    ///
    /// # Returns
    ///
    /// Returns an error if no row carries that api string
    pub async fn update_by_api_string(
        &self,
        api_string: &str,
        changes: model::ActiveModel,
    ) -> Result<()> {
        let result = Model::update_many()
            .set(changes)
            .filter(model::Column::ApiString.eq(api_string))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(anyhow!("Model with api string '{}' not found", api_string));
        }

        Ok(())
    }
}
