//! Datastore seam of the reconciliation engine.
//!
//! The engine only needs point lookups by natural key, bulk lookups by
//! foreign key, inserts with caller-supplied identifiers and partial updates
//! by natural key. [`CatalogStore`] captures exactly that surface;
//! [`DatabaseStore`] implements it on top of the SeaORM repositories.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveValue::NotSet, DatabaseConnection, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::{ChatAppTier, model, provider};
use crate::repositories::{ModelRepository, ProviderRepository};

/// Partial update of a provider row. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderChanges {
    pub api_endpoint: Option<String>,
    pub icon: Option<String>,
}

impl ProviderChanges {
    pub fn is_empty(&self) -> bool {
        self.api_endpoint.is_none() && self.icon.is_none()
    }

    /// Names of the fields this update touches.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.api_endpoint.is_some() {
            fields.push("api_endpoint");
        }
        if self.icon.is_some() {
            fields.push("icon");
        }
        fields
    }
}

/// Partial update of a model row. Only `Some` fields are written; nullable
/// columns use a nested `Option` so that clearing a value is expressible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelChanges {
    pub provider_id: Option<Uuid>,
    pub name: Option<String>,
    pub cost_per_million_token_input: Option<f64>,
    pub cost_per_million_token_output: Option<f64>,
    pub capabilities: Option<JsonValue>,
    pub available_for_chat_app: Option<Option<ChatAppTier>>,
    pub description: Option<String>,
    pub release_date: Option<Option<NaiveDate>>,
    pub is_archived: Option<bool>,
}

impl ModelChanges {
    /// The update issued by the archival sweep.
    pub fn archive() -> Self {
        Self {
            is_archived: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    /// Names of the fields this update touches.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.provider_id.is_some() {
            fields.push("provider_id");
        }
        if self.name.is_some() {
            fields.push("name");
        }
        if self.cost_per_million_token_input.is_some() {
            fields.push("cost_per_million_token_input");
        }
        if self.cost_per_million_token_output.is_some() {
            fields.push("cost_per_million_token_output");
        }
        if self.capabilities.is_some() {
            fields.push("capabilities");
        }
        if self.available_for_chat_app.is_some() {
            fields.push("available_for_chat_app");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.release_date.is_some() {
            fields.push("release_date");
        }
        if self.is_archived.is_some() {
            fields.push("is_archived");
        }
        fields
    }
}

/// Persistence operations required by the reconciliation engine.
///
/// Every operation may fail independently; implementations do not retry.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Point lookup of a provider by name.
    async fn find_provider(&self, name: &str) -> Result<Option<provider::Model>>;

    /// All persisted providers.
    async fn list_providers(&self) -> Result<Vec<provider::Model>>;

    /// Inserts a provider whose id and timestamps were set by the caller.
    async fn insert_provider(&self, record: provider::Model) -> Result<()>;

    /// Partial update of the provider named `name`, refreshing `updated_at`.
    async fn update_provider(
        &self,
        name: &str,
        changes: &ProviderChanges,
        updated_at: DateTimeWithTimeZone,
    ) -> Result<()>;

    /// Point lookup of a model by api string, across all providers.
    async fn find_model(&self, api_string: &str) -> Result<Option<model::Model>>;

    /// All models owned by a provider.
    async fn list_models(&self, provider_id: Uuid) -> Result<Vec<model::Model>>;

    /// Inserts a model whose id and timestamps were set by the caller.
    async fn insert_model(&self, record: model::Model) -> Result<()>;

    /// Partial update of the model with `api_string`, refreshing `updated_at`.
    async fn update_model(
        &self,
        api_string: &str,
        changes: &ModelChanges,
        updated_at: DateTimeWithTimeZone,
    ) -> Result<()>;
}

/// [`CatalogStore`] backed by a SeaORM database connection.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    providers: ProviderRepository,
    models: ModelRepository,
}

impl DatabaseStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            providers: ProviderRepository::new(db.clone()),
            models: ModelRepository::new(db),
        }
    }
}

fn provider_insert(record: provider::Model) -> provider::ActiveModel {
    provider::ActiveModel {
        id: Set(record.id),
        name: Set(record.name),
        api_endpoint: Set(record.api_endpoint),
        icon: Set(record.icon),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

fn provider_update(
    changes: &ProviderChanges,
    updated_at: DateTimeWithTimeZone,
) -> provider::ActiveModel {
    provider::ActiveModel {
        id: NotSet,
        name: NotSet,
        api_endpoint: changes.api_endpoint.clone().map_or(NotSet, Set),
        icon: changes.icon.clone().map_or(NotSet, |icon| Set(Some(icon))),
        created_at: NotSet,
        updated_at: Set(updated_at),
    }
}

fn model_insert(record: model::Model) -> model::ActiveModel {
    model::ActiveModel {
        id: Set(record.id),
        api_string: Set(record.api_string),
        provider_id: Set(record.provider_id),
        name: Set(record.name),
        cost_per_million_token_input: Set(record.cost_per_million_token_input),
        cost_per_million_token_output: Set(record.cost_per_million_token_output),
        capabilities: Set(record.capabilities),
        available_for_chat_app: Set(record.available_for_chat_app),
        description: Set(record.description),
        release_date: Set(record.release_date),
        is_archived: Set(record.is_archived),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

fn model_update(changes: &ModelChanges, updated_at: DateTimeWithTimeZone) -> model::ActiveModel {
    model::ActiveModel {
        id: NotSet,
        api_string: NotSet,
        provider_id: changes.provider_id.map_or(NotSet, Set),
        name: changes.name.clone().map_or(NotSet, Set),
        cost_per_million_token_input: changes.cost_per_million_token_input.map_or(NotSet, Set),
        cost_per_million_token_output: changes.cost_per_million_token_output.map_or(NotSet, Set),
        capabilities: changes.capabilities.clone().map_or(NotSet, Set),
        available_for_chat_app: changes.available_for_chat_app.map_or(NotSet, Set),
        description: changes.description.clone().map_or(NotSet, Set),
        release_date: changes.release_date.map_or(NotSet, Set),
        is_archived: changes.is_archived.map_or(NotSet, Set),
        created_at: NotSet,
        updated_at: Set(updated_at),
    }
}

#[async_trait]
impl CatalogStore for DatabaseStore {
    async fn find_provider(&self, name: &str) -> Result<Option<provider::Model>> {
        self.providers.find_by_name(name).await
    }

    async fn list_providers(&self) -> Result<Vec<provider::Model>> {
        self.providers.find_all().await
    }

    async fn insert_provider(&self, record: provider::Model) -> Result<()> {
        self.providers.create(provider_insert(record)).await?;
        Ok(())
    }

    async fn update_provider(
        &self,
        name: &str,
        changes: &ProviderChanges,
        updated_at: DateTimeWithTimeZone,
    ) -> Result<()> {
        self.providers
            .update_by_name(name, provider_update(changes, updated_at))
            .await
    }

    async fn find_model(&self, api_string: &str) -> Result<Option<model::Model>> {
        self.models.find_by_api_string(api_string).await
    }

    async fn list_models(&self, provider_id: Uuid) -> Result<Vec<model::Model>> {
        self.models.find_by_provider(provider_id).await
    }

    async fn insert_model(&self, record: model::Model) -> Result<()> {
        self.models.create(model_insert(record)).await?;
        Ok(())
    }

    async fn update_model(
        &self,
        api_string: &str,
        changes: &ModelChanges,
        updated_at: DateTimeWithTimeZone,
    ) -> Result<()> {
        self.models
            .update_by_api_string(api_string, model_update(changes, updated_at))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_touches_only_the_flag() {
        let changes = ModelChanges::archive();
        assert_eq!(changes.field_names(), vec!["is_archived"]);
        assert!(!changes.is_empty());
    }

    #[test]
    fn empty_changes_report_no_fields() {
        assert!(ModelChanges::default().is_empty());
        assert!(ProviderChanges::default().is_empty());
    }

    #[test]
    fn clearing_a_nullable_column_counts_as_a_change() {
        let changes = ModelChanges {
            available_for_chat_app: Some(None),
            ..Default::default()
        };
        assert_eq!(changes.field_names(), vec!["available_for_chat_app"]);
    }

    #[test]
    fn provider_update_sets_only_changed_columns() {
        let changes = ProviderChanges {
            icon: Some("https://cdn.example/icon.svg".to_string()),
            ..Default::default()
        };
        let active = provider_update(&changes, chrono::Utc::now().into());
        assert!(active.api_endpoint.is_not_set());
        assert!(active.name.is_not_set());
        assert!(active.icon.is_set());
        assert!(active.updated_at.is_set());
    }
}
