//! Outcome classification, run report and the reporter interface.
//!
//! The engine never logs directly. It emits [`SyncEvent`]s to an injected
//! [`SyncReporter`]; [`TracingReporter`] turns them into `tracing` events and
//! `metrics` counters.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use uuid::Uuid;

/// Result of reconciling one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Created,
    Updated,
    Unchanged,
    Failed,
}

impl ProviderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Failed => "failed",
        }
    }
}

/// Result of reconciling one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelOutcome {
    Created,
    Updated,
    Unchanged,
    SkippedNoPrice,
    SkippedFiltered,
    /// The owning provider could not be resolved this run.
    SkippedProviderUnusable,
    Failed,
}

impl ModelOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::SkippedNoPrice => "skipped_no_price",
            Self::SkippedFiltered => "skipped_filtered",
            Self::SkippedProviderUnusable => "skipped_provider_unusable",
            Self::Failed => "failed",
        }
    }
}

/// Why the sweep archived a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    /// The owning provider is gone from the desired state.
    OrphanedProvider,
    /// The provider remains but no longer lists the model.
    RemovedFromProvider,
}

impl ArchiveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrphanedProvider => "orphaned_provider",
            Self::RemovedFromProvider => "removed_from_provider",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped_no_price: usize,
    pub skipped_filtered: usize,
    pub skipped_provider_unusable: usize,
    pub failed: usize,
}

impl ModelCounts {
    fn record(&mut self, outcome: ModelOutcome) {
        let slot = match outcome {
            ModelOutcome::Created => &mut self.created,
            ModelOutcome::Updated => &mut self.updated,
            ModelOutcome::Unchanged => &mut self.unchanged,
            ModelOutcome::SkippedNoPrice => &mut self.skipped_no_price,
            ModelOutcome::SkippedFiltered => &mut self.skipped_filtered,
            ModelOutcome::SkippedProviderUnusable => &mut self.skipped_provider_unusable,
            ModelOutcome::Failed => &mut self.failed,
        };
        *slot += 1;
    }

    pub fn skipped(&self) -> usize {
        self.skipped_no_price + self.skipped_filtered + self.skipped_provider_unusable
    }
}

/// Counts produced by the archival sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Persisted providers absent from the desired state, whether or not any
    /// of their rows still needed archiving.
    pub providers_orphaned: usize,
    pub models_archived: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRecord {
    pub name: String,
    pub outcome: ProviderOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRecord {
    pub provider: String,
    pub api_string: String,
    pub outcome: ModelOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Operator-facing result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub provider_counts: ProviderCounts,
    pub model_counts: ModelCounts,
    pub sweep: SweepSummary,
    pub providers: Vec<ProviderRecord>,
    pub models: Vec<ModelRecord>,
}

impl SyncReport {
    pub fn new(run_id: Uuid, environment: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            environment: environment.into(),
            started_at,
            finished_at: started_at,
            provider_counts: ProviderCounts::default(),
            model_counts: ModelCounts::default(),
            sweep: SweepSummary::default(),
            providers: Vec::new(),
            models: Vec::new(),
        }
    }

    pub fn record_provider(&mut self, record: ProviderRecord) {
        let counts = &mut self.provider_counts;
        match record.outcome {
            ProviderOutcome::Created => counts.created += 1,
            ProviderOutcome::Updated => counts.updated += 1,
            ProviderOutcome::Unchanged => counts.unchanged += 1,
            ProviderOutcome::Failed => counts.failed += 1,
        }
        self.providers.push(record);
    }

    pub fn record_model(&mut self, record: ModelRecord) {
        self.model_counts.record(record.outcome);
        self.models.push(record);
    }

    /// Outcome recorded for `api_string`, if it was part of the run.
    pub fn model_outcome(&self, api_string: &str) -> Option<ModelOutcome> {
        self.models
            .iter()
            .find(|record| record.api_string == api_string)
            .map(|record| record.outcome)
    }

    /// Number of entities written by create or update.
    pub fn writes(&self) -> usize {
        self.provider_counts.created
            + self.provider_counts.updated
            + self.model_counts.created
            + self.model_counts.updated
    }

    pub fn has_failures(&self) -> bool {
        self.provider_counts.failed > 0 || self.model_counts.failed > 0 || self.sweep.failures > 0
    }
}

/// Structured events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    RunStarted {
        run_id: Uuid,
        environment: String,
        providers: usize,
        models: usize,
    },
    ProviderReconciled {
        provider: String,
        outcome: ProviderOutcome,
        changed_fields: Vec<&'static str>,
    },
    ProviderFailed {
        provider: String,
        code: &'static str,
        error: String,
    },
    ModelReconciled {
        provider: String,
        api_string: String,
        outcome: ModelOutcome,
        changed_fields: Vec<&'static str>,
    },
    ModelFailed {
        provider: String,
        api_string: String,
        code: &'static str,
        error: String,
    },
    MalformedDate {
        provider: String,
        api_string: String,
        value: String,
    },
    ModelArchived {
        provider: String,
        api_string: String,
        reason: ArchiveReason,
    },
    ArchiveFailed {
        provider: String,
        api_string: String,
        error: String,
    },
    /// The sweep could not list rows; `provider` is `None` for the provider listing.
    SweepListingFailed {
        provider: Option<String>,
        error: String,
    },
    RunCompleted {
        run_id: Uuid,
        provider_counts: ProviderCounts,
        model_counts: ModelCounts,
        sweep: SweepSummary,
    },
}

/// Sink for [`SyncEvent`]s.
pub trait SyncReporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// Reporter that logs through `tracing` and counts through `metrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::RunStarted {
                run_id,
                environment,
                providers,
                models,
            } => {
                tracing::info!(%run_id, %environment, providers, models, "Catalog sync started");
            }
            SyncEvent::ProviderReconciled {
                provider,
                outcome,
                changed_fields,
            } => {
                counter!("catalog_sync_providers_total", "outcome" => outcome.as_str())
                    .increment(1);
                tracing::info!(
                    %provider,
                    outcome = outcome.as_str(),
                    changed = ?changed_fields,
                    "Provider reconciled"
                );
            }
            SyncEvent::ProviderFailed {
                provider,
                code,
                error,
            } => {
                counter!("catalog_sync_providers_total", "outcome" => "failed").increment(1);
                tracing::error!(%provider, code, %error, "Provider unusable, skipping its models");
            }
            SyncEvent::ModelReconciled {
                provider,
                api_string,
                outcome,
                changed_fields,
            } => {
                counter!("catalog_sync_models_total", "outcome" => outcome.as_str()).increment(1);
                match outcome {
                    ModelOutcome::Created | ModelOutcome::Updated => tracing::info!(
                        %provider,
                        %api_string,
                        outcome = outcome.as_str(),
                        changed = ?changed_fields,
                        "Model reconciled"
                    ),
                    _ => tracing::debug!(
                        %provider,
                        %api_string,
                        outcome = outcome.as_str(),
                        "Model reconciled"
                    ),
                }
            }
            SyncEvent::ModelFailed {
                provider,
                api_string,
                code,
                error,
            } => {
                counter!("catalog_sync_models_total", "outcome" => "failed").increment(1);
                tracing::error!(%provider, %api_string, code, %error, "Model reconciliation failed");
            }
            SyncEvent::MalformedDate {
                provider,
                api_string,
                value,
            } => {
                tracing::warn!(
                    %provider,
                    %api_string,
                    %value,
                    "Malformed depreciation date, treating model as not depreciated"
                );
            }
            SyncEvent::ModelArchived {
                provider,
                api_string,
                reason,
            } => {
                counter!("catalog_sync_archived_total", "reason" => reason.as_str()).increment(1);
                tracing::info!(%provider, %api_string, reason = reason.as_str(), "Model archived");
            }
            SyncEvent::ArchiveFailed {
                provider,
                api_string,
                error,
            } => {
                counter!("catalog_sync_archive_failures_total").increment(1);
                tracing::error!(%provider, %api_string, %error, "Failed to archive model");
            }
            SyncEvent::SweepListingFailed { provider, error } => {
                counter!("catalog_sync_archive_failures_total").increment(1);
                tracing::error!(provider = ?provider, %error, "Sweep could not list persisted rows");
            }
            SyncEvent::RunCompleted {
                run_id,
                provider_counts,
                model_counts,
                sweep,
            } => {
                tracing::info!(
                    %run_id,
                    providers_created = provider_counts.created,
                    providers_updated = provider_counts.updated,
                    providers_failed = provider_counts.failed,
                    models_created = model_counts.created,
                    models_updated = model_counts.updated,
                    models_unchanged = model_counts.unchanged,
                    models_skipped = model_counts.skipped(),
                    models_failed = model_counts.failed,
                    providers_orphaned = sweep.providers_orphaned,
                    models_archived = sweep.models_archived,
                    sweep_failures = sweep.failures,
                    "Catalog sync complete"
                );
            }
        }
    }
}
