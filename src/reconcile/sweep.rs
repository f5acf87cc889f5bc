//! Soft-delete sweep for entities the desired state no longer lists.

use super::clock::Clock;
use super::model::ModelFilter;
use super::report::{ArchiveReason, SweepSummary, SyncEvent, SyncReporter};
use crate::desired_state::DesiredState;
use crate::models::{model, provider};
use crate::store::{CatalogStore, ModelChanges};

/// Which rows the sweep may archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SweepScope {
    /// Every persisted row absent from the desired state.
    #[default]
    All,
    /// Only rows whose identifier is on the active allow-list. Without an
    /// allow-list this behaves like [`SweepScope::All`].
    AllowListOnly,
}

pub struct ArchivalSweeper<'a> {
    store: &'a dyn CatalogStore,
    clock: &'a dyn Clock,
    reporter: &'a dyn SyncReporter,
}

impl<'a> ArchivalSweeper<'a> {
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

    /// Archives models of orphaned providers, then models dropped from
    /// retained providers. Failures are counted and reported per row.
    pub async fn sweep(
        &self,
        desired: &DesiredState,
        scope: SweepScope,
        filter: Option<&ModelFilter>,
    ) -> SweepSummary {
        let mut summary = SweepSummary::default();
        let filter = match scope {
            SweepScope::All => None,
            SweepScope::AllowListOnly => filter,
        };

        let persisted = match self.store.list_providers().await {
            Ok(providers) => providers,
            Err(err) => {
                summary.failures += 1;
                self.reporter.report(SyncEvent::SweepListingFailed {
                    provider: None,
                    error: format!("{err:#}"),
                });
                return summary;
            }
        };

        let (retained, orphaned): (Vec<_>, Vec<_>) = persisted
            .into_iter()
            .partition(|provider| desired.contains_provider(&provider.name));

        for provider in &orphaned {
            summary.providers_orphaned += 1;
            self.sweep_provider(
                provider,
                desired,
                ArchiveReason::OrphanedProvider,
                filter,
                &mut summary,
            )
            .await;
        }

        for provider in &retained {
            self.sweep_provider(
                provider,
                desired,
                ArchiveReason::RemovedFromProvider,
                filter,
                &mut summary,
            )
            .await;
        }

        summary
    }

    /// Archives every live model of `provider` that no provider in `desired`
    /// lists. A key listed elsewhere is left alone even when its reconcile
    /// was skipped and the row still points at this provider.
    async fn sweep_provider(
        &self,
        provider: &provider::Model,
        desired: &DesiredState,
        reason: ArchiveReason,
        filter: Option<&ModelFilter>,
        summary: &mut SweepSummary,
    ) {
        let models = match self.store.list_models(provider.id).await {
            Ok(models) => models,
            Err(err) => {
                summary.failures += 1;
                self.reporter.report(SyncEvent::SweepListingFailed {
                    provider: Some(provider.name.clone()),
                    error: format!("{err:#}"),
                });
                return;
            }
        };

        let candidates = models.iter().filter(|model| {
            !model.is_archived
                && !desired.contains_model(&model.api_string)
                && filter.is_none_or(|filter| filter.allows(&provider.name, &model.api_string))
        });

        for model in candidates {
            self.archive(provider, model, reason, summary).await;
        }
    }

    async fn archive(
        &self,
        provider: &provider::Model,
        model: &model::Model,
        reason: ArchiveReason,
        summary: &mut SweepSummary,
    ) {
        let result = self
            .store
            .update_model(
                &model.api_string,
                &ModelChanges::archive(),
                self.clock.now().into(),
            )
            .await;

        match result {
            Ok(()) => {
                summary.models_archived += 1;
                self.reporter.report(SyncEvent::ModelArchived {
                    provider: provider.name.clone(),
                    api_string: model.api_string.clone(),
                    reason,
                });
            }
            Err(err) => {
                summary.failures += 1;
                self.reporter.report(SyncEvent::ArchiveFailed {
                    provider: provider.name.clone(),
                    api_string: model.api_string.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }
}
