//! # Catalog Sync Library
//!
//! Reconciles the persisted catalog of AI providers and models with a
//! declarative desired-state document.

pub mod cli;
pub mod config;
pub mod db;
pub mod desired_state;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod repositories;
pub mod store;
pub mod telemetry;
pub use migration;
