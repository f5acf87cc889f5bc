//! Model reconciliation: insert-or-diff-update of one model keyed by its api
//! string.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::clock::Clock;
use super::report::{ModelOutcome, SyncEvent, SyncReporter};
use crate::desired_state::{Pricing, ProviderConfig};
use crate::error::SyncError;
use crate::models::ChatAppTier;
use crate::models::model;
use crate::store::{CatalogStore, ModelChanges};

/// Allow-list of `provider/model` identifiers restricting creates and updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFilter {
    allowed: BTreeSet<String>,
}

impl ModelFilter {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// Full identifier of a model, as used in the allow-list.
    pub fn identifier(provider: &str, api_string: &str) -> String {
        format!("{provider}/{api_string}")
    }

    pub fn allows(&self, provider: &str, api_string: &str) -> bool {
        self.allowed
            .contains(&Self::identifier(provider, api_string))
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static date pattern compiles"))
}

/// Release date encoded in an api string such as `gpt-4o-2024-08-06`.
///
/// Only the first `YYYY-MM-DD` substring is considered; if it is not a valid
/// calendar date the model has no release date.
pub fn release_date_from_api_string(api_string: &str) -> Option<NaiveDate> {
    let found = iso_date_pattern().find(api_string)?;
    NaiveDate::parse_from_str(found.as_str(), "%Y-%m-%d").ok()
}

/// Parses a depreciation date. Accepts a plain date, a local date-time or an
/// RFC 3339 timestamp; only the calendar date is kept.
pub fn parse_depreciation_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Depreciation rule: archived once the depreciation date is today or past.
pub fn is_depreciated(
    api_string: &str,
    depreciation_date: Option<&str>,
    today: NaiveDate,
) -> Result<bool, SyncError> {
    let Some(raw) = depreciation_date else {
        return Ok(false);
    };
    match parse_depreciation_date(raw) {
        Some(date) => Ok(date <= today),
        None => Err(SyncError::MalformedDate {
            api_string: api_string.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// The record a model should have according to the desired state.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredModel {
    pub api_string: String,
    pub provider_id: Uuid,
    pub name: String,
    pub pricing: Pricing,
    pub capabilities: Vec<String>,
    pub available_for_chat_app: Option<ChatAppTier>,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub is_archived: bool,
}

impl DesiredModel {
    /// Builds the desired record for `api_string` under `provider_id`.
    ///
    /// Fails with [`SyncError::MissingPricing`] when the key has no complete
    /// price entry.
    pub fn build(
        provider_id: Uuid,
        api_string: &str,
        config: &ProviderConfig,
        is_archived: bool,
    ) -> Result<Self, SyncError> {
        let pricing = config
            .pricing(api_string)
            .ok_or_else(|| SyncError::MissingPricing {
                api_string: api_string.to_string(),
            })?;

        Ok(Self {
            api_string: api_string.to_string(),
            provider_id,
            name: config.display_name(api_string).to_string(),
            pricing,
            capabilities: config.capabilities(api_string).to_vec(),
            available_for_chat_app: config.chat_app_tier(api_string),
            description: config.description(api_string).to_string(),
            release_date: release_date_from_api_string(api_string),
            is_archived,
        })
    }

    fn capabilities_json(&self) -> JsonValue {
        JsonValue::from(self.capabilities.clone())
    }

    /// Full row for an insert.
    pub fn into_record(self, id: Uuid, now: chrono::DateTime<chrono::Utc>) -> model::Model {
        let capabilities = self.capabilities_json();
        model::Model {
            id,
            api_string: self.api_string,
            provider_id: self.provider_id,
            name: self.name,
            cost_per_million_token_input: self.pricing.input,
            cost_per_million_token_output: self.pricing.output,
            capabilities,
            available_for_chat_app: self.available_for_chat_app,
            description: self.description,
            release_date: self.release_date,
            is_archived: self.is_archived,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    /// Field-level difference against a stored row. Capabilities compare as
    /// sets; everything else compares exactly.
    pub fn diff(&self, existing: &model::Model) -> ModelChanges {
        let mut changes = ModelChanges::default();

        if existing.provider_id != self.provider_id {
            changes.provider_id = Some(self.provider_id);
        }
        if existing.name != self.name {
            changes.name = Some(self.name.clone());
        }
        if existing.cost_per_million_token_input != self.pricing.input {
            changes.cost_per_million_token_input = Some(self.pricing.input);
        }
        if existing.cost_per_million_token_output != self.pricing.output {
            changes.cost_per_million_token_output = Some(self.pricing.output);
        }

        let desired_caps: BTreeSet<String> = self.capabilities.iter().cloned().collect();
        if existing.capability_set().as_ref() != Some(&desired_caps) {
            changes.capabilities = Some(self.capabilities_json());
        }

        if existing.available_for_chat_app != self.available_for_chat_app {
            changes.available_for_chat_app = Some(self.available_for_chat_app);
        }
        if existing.description != self.description {
            changes.description = Some(self.description.clone());
        }
        if existing.release_date != self.release_date {
            changes.release_date = Some(self.release_date);
        }
        if existing.is_archived != self.is_archived {
            changes.is_archived = Some(self.is_archived);
        }

        changes
    }
}

/// Result of reconciling one model.
#[derive(Debug)]
pub struct ModelSync {
    pub outcome: ModelOutcome,
    pub changed_fields: Vec<&'static str>,
    /// Cause of a `Failed` outcome.
    pub error: Option<SyncError>,
}

impl ModelSync {
    fn outcome(outcome: ModelOutcome) -> Self {
        Self {
            outcome,
            changed_fields: Vec::new(),
            error: None,
        }
    }

    fn failed(error: SyncError) -> Self {
        Self {
            outcome: ModelOutcome::Failed,
            changed_fields: Vec::new(),
            error: Some(error),
        }
    }
}

pub struct ModelReconciler<'a> {
    store: &'a dyn CatalogStore,
    clock: &'a dyn Clock,
    reporter: &'a dyn SyncReporter,
}

impl<'a> ModelReconciler<'a> {
    pub fn new(
        store: &'a dyn CatalogStore,
        clock: &'a dyn Clock,
        reporter: &'a dyn SyncReporter,
    ) -> Self {
        Self {
            store,
            clock,
            reporter,
        }
    }

    /// Reconciles `api_string` of `provider` against the store.
    ///
    /// Never returns an error: backend failures become a `Failed` outcome
    /// scoped to this model.
    pub async fn reconcile(
        &self,
        provider: &str,
        provider_id: Uuid,
        api_string: &str,
        config: &ProviderConfig,
        filter: Option<&ModelFilter>,
    ) -> ModelSync {
        if filter.is_some_and(|filter| !filter.allows(provider, api_string)) {
            return ModelSync::outcome(ModelOutcome::SkippedFiltered);
        }

        let mut desired = match DesiredModel::build(provider_id, api_string, config, false) {
            Ok(desired) => desired,
            Err(err) if err.is_skip() => return ModelSync::outcome(ModelOutcome::SkippedNoPrice),
            Err(err) => return ModelSync::failed(err),
        };

        desired.is_archived = match is_depreciated(
            api_string,
            config.depreciation_date(api_string),
            self.clock.today(),
        ) {
            Ok(archived) => archived,
            Err(SyncError::MalformedDate { value, .. }) => {
                self.reporter.report(SyncEvent::MalformedDate {
                    provider: provider.to_string(),
                    api_string: api_string.to_string(),
                    value,
                });
                false
            }
            Err(err) => return ModelSync::failed(err),
        };

        let entity = format!("model '{api_string}'");
        let existing = match self.store.find_model(api_string).await {
            Ok(existing) => existing,
            Err(err) => return ModelSync::failed(SyncError::lookup(entity, err)),
        };

        let Some(existing) = existing else {
            let record = desired.into_record(Uuid::new_v4(), self.clock.now());
            return match self.store.insert_model(record).await {
                Ok(()) => ModelSync::outcome(ModelOutcome::Created),
                Err(err) => ModelSync::failed(SyncError::write(entity, err)),
            };
        };

        let changes = desired.diff(&existing);
        if changes.is_empty() {
            return ModelSync::outcome(ModelOutcome::Unchanged);
        }

        match self
            .store
            .update_model(api_string, &changes, self.clock.now().into())
            .await
        {
            Ok(()) => ModelSync {
                outcome: ModelOutcome::Updated,
                changed_fields: changes.field_names(),
                error: None,
            },
            Err(err) => ModelSync::failed(SyncError::write(entity, err)),
        }
    }
}
