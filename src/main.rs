//! # Catalog Sync Entry Point

use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_sync::{
    cli::Cli,
    config::ConfigLoader,
    db,
    desired_state::DesiredState,
    reconcile::Synchronizer,
    store::DatabaseStore,
    telemetry::init_tracing,
};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_base_dir(dir.clone()),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("loading configuration")?;
    init_tracing(&config).context("initializing tracing")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let desired = DesiredState::load(&cli.json)
        .with_context(|| format!("loading desired state from {}", cli.json.display()))?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::health_check(&db).await?;
    if cli.migrate {
        db::migrate(&db).await?;
    }

    let store = Arc::new(DatabaseStore::new(Arc::new(db)));
    let synchronizer = Synchronizer::new(store, config.provider_endpoints.clone());
    let report = synchronizer.run(&desired, &cli.run_options()).await;

    if let Some(path) = &cli.report {
        let body = serde_json::to_string_pretty(&report).context("serializing run report")?;
        std::fs::write(path, body)
            .with_context(|| format!("writing run report to {}", path.display()))?;
    }

    if report.has_failures() {
        tracing::warn!(
            providers_failed = report.provider_counts.failed,
            models_failed = report.model_counts.failed,
            sweep_failures = report.sweep.failures,
            "Catalog sync finished with failures"
        );
    }

    Ok(())
}
