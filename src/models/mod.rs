//! # Data Models
//!
//! SeaORM entities for the persisted catalog.

pub mod model;
pub mod provider;

pub use model::ChatAppTier;
pub use model::Entity as Model;
pub use provider::Entity as Provider;
