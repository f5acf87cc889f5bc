//! Configuration loading for the catalog sync.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `CATALOG_`, producing a typed [`AppConfig`]. Unprefixed
//! `<PROVIDER>_API_ENDPOINT` variables from the same layers are collected into
//! [`ProviderEndpoints`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "CATALOG_";
const ENDPOINT_SUFFIX: &str = "_API_ENDPOINT";

/// Application configuration derived from `CATALOG_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "ProviderEndpoints::is_empty")]
    pub provider_endpoints: ProviderEndpoints,
}

/// Provider API endpoints keyed by environment variable name
/// (`<UPPERCASED_PROVIDER_NAME>_API_ENDPOINT`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderEndpoints(BTreeMap<String, String>);

impl ProviderEndpoints {
    /// Variable name holding the endpoint override for `provider`.
    pub fn variable_name(provider: &str) -> String {
        format!("{}{}", provider.to_uppercase(), ENDPOINT_SUFFIX)
    }

    /// Endpoint for `provider`, or an empty string when none is configured.
    pub fn resolve(&self, provider: &str) -> &str {
        self.0
            .get(&Self::variable_name(provider))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn insert(&mut self, variable: impl Into<String>, endpoint: impl Into<String>) {
        self.0.insert(variable.into(), endpoint.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (variable, value) in &self.0 {
            if value.is_empty() {
                continue;
            }
            Url::parse(value).map_err(|source| ConfigError::InvalidProviderEndpoint {
                variable: variable.clone(),
                value: value.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProviderEndpoints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: String::new(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            provider_endpoints: ProviderEndpoints::default(),
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (database password masked).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.database_url = redact_database_url(&config.database_url);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.db_max_connections == 0 || self.db_max_connections > 100 {
            return Err(ConfigError::InvalidMaxConnections {
                value: self.db_max_connections,
            });
        }

        if self.db_acquire_timeout_ms == 0 {
            return Err(ConfigError::InvalidAcquireTimeout);
        }

        self.provider_endpoints.validate()
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("[REDACTED]")).is_err() {
                return "[REDACTED]".to_string();
            }
            url.to_string()
        }
        Ok(_) => raw.to_string(),
        Err(_) if raw.is_empty() => String::new(),
        Err(_) => "[REDACTED]".to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("database URL is missing; set CATALOG_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("database max connections must be between 1 and 100, got {value}")]
    InvalidMaxConnections { value: u32 },
    #[error("database acquire timeout must be positive")]
    InvalidAcquireTimeout,
    #[error("invalid numeric value '{value}' for {key}")]
    InvalidNumber { key: String, value: String },
    #[error("invalid endpoint '{value}' in {variable}: {source}")]
    InvalidProviderEndpoint {
        variable: String,
        value: String,
        source: url::ParseError,
    },
}

/// Values gathered from the env layers before they are typed.
#[derive(Debug, Default)]
struct Layered {
    settings: BTreeMap<String, String>,
    endpoints: ProviderEndpoints,
}

impl Layered {
    /// No `CATALOG_*` setting ends in `_API_ENDPOINT`, so the suffix wins.
    fn absorb(&mut self, key: &str, value: String) {
        if key.ends_with(ENDPOINT_SUFFIX) {
            self.endpoints.insert(key, value);
        } else if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            self.settings.insert(stripped.to_string(), value);
        }
    }
}

/// Loads configuration using layered `.env` files and `CATALOG_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration. The process environment wins over
    /// every file layer.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            layered.absorb(&key, value);
        }

        let Layered {
            settings: mut values,
            endpoints,
        } = layered;

        let profile = values
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = values
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = values
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = values.remove("DATABASE_URL").unwrap_or_default();
        let db_max_connections = parse_number(&mut values, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = parse_number(&mut values, "DB_ACQUIRE_TIMEOUT_MS")?
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            provider_endpoints: endpoints,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(Layered, String), ConfigError> {
        let mut layered = Layered::default();

        self.merge_dotenv(self.base_dir.join(".env"), &mut layered)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut layered)?;

        let profile = env::var("CATALOG_PROFILE")
            .ok()
            .or_else(|| layered.settings.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut layered,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut layered,
        )?;

        Ok((layered, profile))
    }

    fn merge_dotenv(&self, path: PathBuf, layered: &mut Layered) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    layered.absorb(&key, value);
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match values.remove(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
        None => Ok(None),
    }
}
