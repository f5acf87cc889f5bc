//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! catalog tables.

pub mod model;
pub mod provider;

pub use model::ModelRepository;
pub use provider::ProviderRepository;
