//! Test utilities for catalog reconciliation.
//!
//! Provides an in-memory SQLite database with migrations applied, a recording
//! reporter and a store wrapper that injects backend failures.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use catalog_sync::desired_state::DesiredState;
use catalog_sync::models::{model, provider};
use catalog_sync::reconcile::{FixedClock, SyncEvent, SyncReporter};
use catalog_sync::store::{CatalogStore, DatabaseStore, ModelChanges, ProviderChanges};
use chrono::{TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up an in-memory SQLite database and returns it Arc-wrapped.
#[allow(dead_code)]
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// A [`DatabaseStore`] over a fresh in-memory database.
#[allow(dead_code)]
pub async fn setup_store() -> Result<Arc<DatabaseStore>> {
    Ok(Arc::new(DatabaseStore::new(setup_test_db_arc().await?)))
}

/// Clock frozen at noon UTC on the given date.
#[allow(dead_code)]
pub fn clock_at(year: i32, month: u32, day: u32) -> Arc<FixedClock> {
    let instant = Utc
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid test date");
    Arc::new(FixedClock(instant))
}

#[allow(dead_code)]
pub fn desired(doc: serde_json::Value) -> DesiredState {
    DesiredState::from_json_str(&doc.to_string()).expect("valid desired state")
}

/// Reporter that keeps every event for later assertions.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SyncEvent>>,
}

#[allow(dead_code)]
impl RecordingReporter {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub fn count(&self, predicate: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}

impl SyncReporter for RecordingReporter {
    fn report(&self, event: SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(event);
    }
}

/// Store that delegates to a real store but fails selected operations.
#[allow(dead_code)]
pub struct FaultyStore<S> {
    inner: S,
    failing_provider_lookups: HashSet<String>,
    failing_model_writes: HashSet<String>,
    failing_model_listings: HashSet<Uuid>,
    fail_provider_listing: bool,
}

#[allow(dead_code)]
impl<S: CatalogStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_provider_lookups: HashSet::new(),
            failing_model_writes: HashSet::new(),
            failing_model_listings: HashSet::new(),
            fail_provider_listing: false,
        }
    }

    pub fn fail_provider_lookup(mut self, name: &str) -> Self {
        self.failing_provider_lookups.insert(name.to_string());
        self
    }

    /// Fails inserts and updates of the model with `api_string`.
    pub fn fail_model_write(mut self, api_string: &str) -> Self {
        self.failing_model_writes.insert(api_string.to_string());
        self
    }

    pub fn fail_model_listing(mut self, provider_id: Uuid) -> Self {
        self.failing_model_listings.insert(provider_id);
        self
    }

    pub fn fail_provider_listing(mut self) -> Self {
        self.fail_provider_listing = true;
        self
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for FaultyStore<S> {
    async fn find_provider(&self, name: &str) -> Result<Option<provider::Model>> {
        if self.failing_provider_lookups.contains(name) {
            return Err(anyhow!("injected lookup failure for provider {name}"));
        }
        self.inner.find_provider(name).await
    }

    async fn list_providers(&self) -> Result<Vec<provider::Model>> {
        if self.fail_provider_listing {
            return Err(anyhow!("injected provider listing failure"));
        }
        self.inner.list_providers().await
    }

    async fn insert_provider(&self, record: provider::Model) -> Result<()> {
        self.inner.insert_provider(record).await
    }

    async fn update_provider(
        &self,
        name: &str,
        changes: &ProviderChanges,
        updated_at: DateTimeWithTimeZone,
    ) -> Result<()> {
        self.inner.update_provider(name, changes, updated_at).await
    }

    async fn find_model(&self, api_string: &str) -> Result<Option<model::Model>> {
        self.inner.find_model(api_string).await
    }

    async fn list_models(&self, provider_id: Uuid) -> Result<Vec<model::Model>> {
        if self.failing_model_listings.contains(&provider_id) {
            return Err(anyhow!("injected model listing failure"));
        }
        self.inner.list_models(provider_id).await
    }

    async fn insert_model(&self, record: model::Model) -> Result<()> {
        if self.failing_model_writes.contains(&record.api_string) {
            return Err(anyhow!("injected write failure for {}", record.api_string));
        }
        self.inner.insert_model(record).await
    }

    async fn update_model(
        &self,
        api_string: &str,
        changes: &ModelChanges,
        updated_at: DateTimeWithTimeZone,
    ) -> Result<()> {
        if self.failing_model_writes.contains(api_string) {
            return Err(anyhow!("injected write failure for {api_string}"));
        }
        self.inner.update_model(api_string, changes, updated_at).await
    }
}

/// Inserts a provider row directly, bypassing reconciliation.
#[allow(dead_code)]
pub async fn insert_provider(store: &dyn CatalogStore, name: &str) -> Result<Uuid> {
    let now = Utc::now().into();
    let id = Uuid::new_v4();
    store
        .insert_provider(provider::Model {
            id,
            name: name.to_string(),
            api_endpoint: String::new(),
            icon: None,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(id)
}

/// Inserts a live model row directly, bypassing reconciliation.
#[allow(dead_code)]
pub async fn insert_model(store: &dyn CatalogStore, provider_id: Uuid, api_string: &str) -> Result<()> {
    let now = Utc::now().into();
    store
        .insert_model(model::Model {
            id: Uuid::new_v4(),
            api_string: api_string.to_string(),
            provider_id,
            name: api_string.to_string(),
            cost_per_million_token_input: 1.0,
            cost_per_million_token_output: 2.0,
            capabilities: serde_json::json!([]),
            available_for_chat_app: None,
            description: String::new(),
            release_date: None,
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
        .await
}
