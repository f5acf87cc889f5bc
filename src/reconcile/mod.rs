//! # Catalog Reconciliation
//!
//! Drives a desired-state document into the store: providers in document
//! order, each provider's models in list order, then the archival sweep.
//! There is no transactional boundary. A run stopped half-way leaves a valid
//! catalog that the next run completes.

pub mod clock;
pub mod model;
pub mod provider;
pub mod report;
pub mod sweep;

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

pub use clock::{Clock, FixedClock, SystemClock};
pub use model::{DesiredModel, ModelFilter, ModelReconciler, ModelSync};
pub use provider::{ProviderReconciler, ProviderSync};
pub use report::{
    ArchiveReason, ModelCounts, ModelOutcome, ModelRecord, ProviderCounts, ProviderOutcome,
    ProviderRecord, SweepSummary, SyncEvent, SyncReport, SyncReporter, TracingReporter,
};
pub use sweep::{ArchivalSweeper, SweepScope};

use crate::config::ProviderEndpoints;
use crate::desired_state::{DesiredState, ProviderConfig};
use crate::store::CatalogStore;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deployment label recorded in the report.
    pub environment: String,
    /// Restricts creates and updates to these identifiers.
    pub filter: Option<ModelFilter>,
    pub sweep_scope: SweepScope,
}

/// Reconciliation orchestrator.
#[derive(Clone)]
pub struct Synchronizer {
    store: Arc<dyn CatalogStore>,
    endpoints: ProviderEndpoints,
    reporter: Arc<dyn SyncReporter>,
    clock: Arc<dyn Clock>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn CatalogStore>, endpoints: ProviderEndpoints) -> Self {
        Self {
            store,
            endpoints,
            reporter: Arc::new(TracingReporter),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SyncReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs one full reconciliation. Entity failures are recorded in the
    /// report; the run itself never fails.
    pub async fn run(&self, desired: &DesiredState, options: &RunOptions) -> SyncReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "sync_run",
            %run_id,
            environment = %options.environment
        );
        self.run_inner(run_id, desired, options).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        desired: &DesiredState,
        options: &RunOptions,
    ) -> SyncReport {
        let mut report = SyncReport::new(run_id, &options.environment, self.clock.now());
        self.reporter.report(SyncEvent::RunStarted {
            run_id,
            environment: options.environment.clone(),
            providers: desired.providers().count(),
            models: desired.model_count(),
        });

        for (name, config) in desired.providers() {
            self.sync_provider(name, config, options.filter.as_ref(), &mut report)
                .await;
        }

        let sweeper = ArchivalSweeper::new(
            self.store.as_ref(),
            self.clock.as_ref(),
            self.reporter.as_ref(),
        );
        report.sweep = sweeper
            .sweep(desired, options.sweep_scope, options.filter.as_ref())
            .await;

        report.finished_at = self.clock.now();
        self.reporter.report(SyncEvent::RunCompleted {
            run_id,
            provider_counts: report.provider_counts,
            model_counts: report.model_counts,
            sweep: report.sweep,
        });
        report
    }

    async fn sync_provider(
        &self,
        name: &str,
        config: &ProviderConfig,
        filter: Option<&ModelFilter>,
        report: &mut SyncReport,
    ) {
        let providers =
            ProviderReconciler::new(self.store.as_ref(), &self.endpoints, self.clock.as_ref());

        let provider_id = match providers.reconcile(name, config).await {
            Ok(sync) => {
                self.reporter.report(SyncEvent::ProviderReconciled {
                    provider: name.to_string(),
                    outcome: sync.outcome,
                    changed_fields: sync.changed_fields.clone(),
                });
                report.record_provider(ProviderRecord {
                    name: name.to_string(),
                    outcome: sync.outcome,
                    changed_fields: sync.changed_fields,
                    error: None,
                });
                sync.id
            }
            Err(err) => {
                self.reporter.report(SyncEvent::ProviderFailed {
                    provider: name.to_string(),
                    code: err.code(),
                    error: err.to_string(),
                });
                report.record_provider(ProviderRecord {
                    name: name.to_string(),
                    outcome: ProviderOutcome::Failed,
                    changed_fields: Vec::new(),
                    error: Some(err.to_string()),
                });
                for key in config.model_keys() {
                    report.record_model(ModelRecord {
                        provider: name.to_string(),
                        api_string: key.clone(),
                        outcome: ModelOutcome::SkippedProviderUnusable,
                        changed_fields: Vec::new(),
                        error: None,
                    });
                }
                return;
            }
        };

        let models = ModelReconciler::new(
            self.store.as_ref(),
            self.clock.as_ref(),
            self.reporter.as_ref(),
        );
        for key in config.model_keys() {
            let sync = models
                .reconcile(name, provider_id, key, config, filter)
                .await;

            let error = match &sync.error {
                Some(err) => {
                    self.reporter.report(SyncEvent::ModelFailed {
                        provider: name.to_string(),
                        api_string: key.clone(),
                        code: err.code(),
                        error: err.to_string(),
                    });
                    Some(err.to_string())
                }
                None => {
                    self.reporter.report(SyncEvent::ModelReconciled {
                        provider: name.to_string(),
                        api_string: key.clone(),
                        outcome: sync.outcome,
                        changed_fields: sync.changed_fields.clone(),
                    });
                    None
                }
            };

            report.record_model(ModelRecord {
                provider: name.to_string(),
                api_string: key.clone(),
                outcome: sync.outcome,
                changed_fields: sync.changed_fields,
                error,
            });
        }
    }
}
