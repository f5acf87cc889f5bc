//! # Error Handling
//!
//! Error taxonomy of the reconciliation engine. Every variant is scoped to a
//! single entity: none of them aborts a run.

use thiserror::Error;

/// Boxed backend error carried by lookup and write failures.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while reconciling one provider or model.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The model key has no complete pricing entry; the entity is skipped.
    #[error("no pricing configured for model '{api_string}'")]
    MissingPricing { api_string: String },

    /// A depreciation date did not parse; it is treated as absent.
    #[error("malformed depreciation date '{value}' for model '{api_string}'")]
    MalformedDate { api_string: String, value: String },

    #[error("failed to look up {entity}: {source}")]
    LookupFailure {
        entity: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to write {entity}: {source}")]
    WriteFailure {
        entity: String,
        #[source]
        source: BackendError,
    },

    /// The provider row could not be resolved, so its models are skipped.
    #[error("provider '{provider}' is unusable this run: {source}")]
    ProviderUnusable {
        provider: String,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub fn lookup(entity: impl Into<String>, source: impl Into<BackendError>) -> Self {
        Self::LookupFailure {
            entity: entity.into(),
            source: source.into(),
        }
    }

    pub fn write(entity: impl Into<String>, source: impl Into<BackendError>) -> Self {
        Self::WriteFailure {
            entity: entity.into(),
            source: source.into(),
        }
    }

    pub fn provider_unusable(provider: impl Into<String>, cause: SyncError) -> Self {
        Self::ProviderUnusable {
            provider: provider.into(),
            source: Box::new(cause),
        }
    }

    /// Skip conditions are expected states of the desired document, not
    /// backend failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::MissingPricing { .. })
    }

    /// Stable code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPricing { .. } => "MISSING_PRICING",
            Self::MalformedDate { .. } => "MALFORMED_DATE",
            Self::LookupFailure { .. } => "LOOKUP_FAILURE",
            Self::WriteFailure { .. } => "WRITE_FAILURE",
            Self::ProviderUnusable { .. } => "PROVIDER_UNUSABLE",
        }
    }
}
