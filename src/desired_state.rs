//! Desired-state document.
//!
//! The catalog is described by a JSON object mapping provider name to a
//! provider config. Per-model attributes live in parallel maps keyed by model
//! key. Provider order and model list order are preserved because the
//! reconciliation processes entities in document order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::models::ChatAppTier;

/// Errors that can occur while loading a desired-state document.
#[derive(Debug, Error)]
pub enum DesiredStateError {
    #[error("failed to read desired state from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("desired state is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("desired state must be a JSON object mapping provider names to configs")]
    NotAnObject,
    #[error("invalid config for provider '{provider}': {source}")]
    InvalidProvider {
        provider: String,
        source: serde_json::Error,
    },
    #[error("model key '{key}' is listed under both '{first}' and '{second}'")]
    DuplicateModelKey {
        key: String,
        first: String,
        second: String,
    },
}

/// Input and output price per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PriceEntry {
    #[serde(default)]
    input: Option<f64>,
    #[serde(default)]
    output: Option<f64>,
}

/// Configuration of one provider and its models.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    models: Vec<String>,
    #[serde(default)]
    price: BTreeMap<String, PriceEntry>,
    #[serde(default)]
    name: BTreeMap<String, Option<String>>,
    #[serde(default, alias = "support_media_inputs")]
    capabilities: BTreeMap<String, Option<Vec<String>>>,
    #[serde(default)]
    available_for_chat_app: BTreeMap<String, JsonValue>,
    #[serde(default)]
    description: BTreeMap<String, Option<String>>,
    #[serde(default)]
    depreciation_date: BTreeMap<String, Option<String>>,
}

impl ProviderConfig {
    /// Provider icon URL; empty strings count as absent.
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref().filter(|icon| !icon.is_empty())
    }

    /// Model keys in document order.
    pub fn model_keys(&self) -> &[String] {
        &self.models
    }

    pub fn contains_model(&self, key: &str) -> bool {
        self.models.iter().any(|model| model == key)
    }

    /// Pricing for `key`, present only when both input and output are set.
    pub fn pricing(&self, key: &str) -> Option<Pricing> {
        let entry = self.price.get(key)?;
        Some(Pricing {
            input: entry.input?,
            output: entry.output?,
        })
    }

    /// Display name, defaulting to the model key.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.name
            .get(key)
            .and_then(|name| name.as_deref())
            .unwrap_or(key)
    }

    pub fn capabilities(&self, key: &str) -> &[String] {
        self.capabilities
            .get(key)
            .and_then(|caps| caps.as_deref())
            .unwrap_or(&[])
    }

    /// Chat tier for `key`; unknown or non-string values coerce to `None`.
    pub fn chat_app_tier(&self, key: &str) -> Option<ChatAppTier> {
        self.available_for_chat_app
            .get(key)
            .and_then(JsonValue::as_str)
            .and_then(ChatAppTier::coerce)
    }

    pub fn description(&self, key: &str) -> &str {
        self.description
            .get(key)
            .and_then(|text| text.as_deref())
            .unwrap_or("")
    }

    /// Raw depreciation date string, unparsed.
    pub fn depreciation_date(&self, key: &str) -> Option<&str> {
        self.depreciation_date
            .get(key)
            .and_then(|date| date.as_deref())
    }

    fn dedup_models(&mut self) {
        let mut seen = HashSet::new();
        self.models.retain(|model| seen.insert(model.clone()));
    }
}

/// The intended catalog, in document order.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    providers: Vec<(String, ProviderConfig)>,
}

impl DesiredState {
    /// Reads and validates a document from disk.
    pub fn load(path: &Path) -> Result<Self, DesiredStateError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DesiredStateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a document.
    pub fn from_json_str(raw: &str) -> Result<Self, DesiredStateError> {
        let value: JsonValue = serde_json::from_str(raw)?;
        let JsonValue::Object(entries) = value else {
            return Err(DesiredStateError::NotAnObject);
        };

        let mut providers = Vec::with_capacity(entries.len());
        for (provider, config) in entries {
            let mut config: ProviderConfig = serde_json::from_value(config).map_err(|source| {
                DesiredStateError::InvalidProvider {
                    provider: provider.clone(),
                    source,
                }
            })?;
            config.dedup_models();
            providers.push((provider, config));
        }

        let state = Self { providers };
        state.validate()?;
        Ok(state)
    }

    /// Model keys are resolved globally, so one key may belong to a single
    /// provider only.
    fn validate(&self) -> Result<(), DesiredStateError> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (provider, config) in &self.providers {
            for key in config.model_keys() {
                if let Some(first) = owners.insert(key, provider)
                    && first != provider.as_str()
                {
                    return Err(DesiredStateError::DuplicateModelKey {
                        key: key.clone(),
                        first: first.to_string(),
                        second: provider.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Providers in document order.
    pub fn providers(&self) -> impl Iterator<Item = (&str, &ProviderConfig)> {
        self.providers
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|(provider, _)| provider == name)
            .map(|(_, config)| config)
    }

    pub fn contains_provider(&self, name: &str) -> bool {
        self.provider(name).is_some()
    }

    /// Whether any provider lists `key`.
    pub fn contains_model(&self, key: &str) -> bool {
        self.providers
            .iter()
            .any(|(_, config)| config.contains_model(key))
    }

    pub fn model_count(&self) -> usize {
        self.providers
            .iter()
            .map(|(_, config)| config.model_keys().len())
            .sum()
    }
}
