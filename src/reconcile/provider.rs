//! Provider reconciliation: one persisted row per desired provider name.

use uuid::Uuid;

use super::clock::Clock;
use super::report::ProviderOutcome;
use crate::config::ProviderEndpoints;
use crate::desired_state::ProviderConfig;
use crate::error::SyncError;
use crate::models::provider;
use crate::store::{CatalogStore, ProviderChanges};

/// Result of a successful provider reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSync {
    pub id: Uuid,
    pub outcome: ProviderOutcome,
    pub changed_fields: Vec<&'static str>,
}

/// Computes the update for an existing provider.
///
/// A field is only written when the desired value is non-empty and differs
/// from the stored one, so an unset endpoint or icon never clears a stored
/// value.
pub fn diff_provider(
    existing: &provider::Model,
    api_endpoint: &str,
    icon: Option<&str>,
) -> ProviderChanges {
    let mut changes = ProviderChanges::default();

    if !api_endpoint.is_empty() && existing.api_endpoint != api_endpoint {
        changes.api_endpoint = Some(api_endpoint.to_string());
    }

    if let Some(icon) = icon.filter(|icon| !icon.is_empty())
        && existing.icon.as_deref() != Some(icon)
    {
        changes.icon = Some(icon.to_string());
    }

    changes
}

pub struct ProviderReconciler<'a> {
    store: &'a dyn CatalogStore,
    endpoints: &'a ProviderEndpoints,
    clock: &'a dyn Clock,
}

impl<'a> ProviderReconciler<'a> {
    pub fn new(
        store: &'a dyn CatalogStore,
        endpoints: &'a ProviderEndpoints,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            endpoints,
            clock,
        }
    }

    /// Ensures the provider `name` exists and matches `config`, returning its id.
    ///
    /// Any lookup or write failure is returned as
    /// [`SyncError::ProviderUnusable`].
    pub async fn reconcile(
        &self,
        name: &str,
        config: &ProviderConfig,
    ) -> Result<ProviderSync, SyncError> {
        let entity = format!("provider '{name}'");
        let api_endpoint = self.endpoints.resolve(name);
        let icon = config.icon();

        let existing = self
            .store
            .find_provider(name)
            .await
            .map_err(|err| SyncError::provider_unusable(name, SyncError::lookup(&entity, err)))?;

        let Some(existing) = existing else {
            let now = self.clock.now();
            let record = provider::Model {
                id: Uuid::new_v4(),
                name: name.to_string(),
                api_endpoint: api_endpoint.to_string(),
                icon: icon.map(str::to_string),
                created_at: now.into(),
                updated_at: now.into(),
            };
            let id = record.id;
            self.store.insert_provider(record).await.map_err(|err| {
                SyncError::provider_unusable(name, SyncError::write(&entity, err))
            })?;

            return Ok(ProviderSync {
                id,
                outcome: ProviderOutcome::Created,
                changed_fields: Vec::new(),
            });
        };

        let changes = diff_provider(&existing, api_endpoint, icon);
        if changes.is_empty() {
            return Ok(ProviderSync {
                id: existing.id,
                outcome: ProviderOutcome::Unchanged,
                changed_fields: Vec::new(),
            });
        }

        let updated_at = self.clock.now().into();
        self.store
            .update_provider(name, &changes, updated_at)
            .await
            .map_err(|err| SyncError::provider_unusable(name, SyncError::write(&entity, err)))?;

        Ok(ProviderSync {
            id: existing.id,
            outcome: ProviderOutcome::Updated,
            changed_fields: changes.field_names(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(api_endpoint: &str, icon: Option<&str>) -> provider::Model {
        let now = Utc::now().into();
        provider::Model {
            id: Uuid::new_v4(),
            name: "openai".to_string(),
            api_endpoint: api_endpoint.to_string(),
            icon: icon.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_desired_values_never_clear_stored_ones() {
        let existing = stored("https://api.openai.com/v1", Some("https://cdn/openai.svg"));
        assert!(diff_provider(&existing, "", None).is_empty());
        assert!(diff_provider(&existing, "", Some("")).is_empty());
    }

    #[test]
    fn differing_values_are_written() {
        let existing = stored("", None);
        let changes = diff_provider(
            &existing,
            "https://api.openai.com/v1",
            Some("https://cdn/openai.svg"),
        );
        assert_eq!(changes.field_names(), vec!["api_endpoint", "icon"]);
    }

    #[test]
    fn equal_values_produce_no_update() {
        let existing = stored("https://api.openai.com/v1", Some("https://cdn/openai.svg"));
        let changes = diff_provider(
            &existing,
            "https://api.openai.com/v1",
            Some("https://cdn/openai.svg"),
        );
        assert!(changes.is_empty());
    }
}
