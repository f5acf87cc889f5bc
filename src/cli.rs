//! Command-line arguments of the `catalog-sync` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::reconcile::{ModelFilter, RunOptions, SweepScope};

/// Deployment the run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

/// Reconcile the provider and model catalog with a desired-state document
#[derive(Debug, Parser)]
#[command(name = "catalog-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the desired-state JSON document
    #[arg(long = "json", value_name = "PATH")]
    pub json: PathBuf,

    /// Target deployment
    #[arg(long, value_enum)]
    pub env: Environment,

    /// Comma-separated `provider/model` identifiers to restrict creates and updates to
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub models: Option<Vec<String>>,

    /// Only archive rows that are on the --models allow-list
    #[arg(long)]
    pub sweep_allow_listed_only: bool,

    /// Apply pending schema migrations before syncing
    #[arg(long)]
    pub migrate: bool,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Directory holding the `.env` layers (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Cli {
    /// Allow-list built from `--models`, ignoring blank entries.
    pub fn model_filter(&self) -> Option<ModelFilter> {
        let ids = self.models.as_ref()?;
        let filter = ModelFilter::new(
            ids.iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        );
        (!filter.is_empty()).then_some(filter)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            environment: self.env.as_str().to_string(),
            filter: self.model_filter(),
            sweep_scope: if self.sweep_allow_listed_only {
                SweepScope::AllowListOnly
            } else {
                SweepScope::All
            },
        }
    }
}
