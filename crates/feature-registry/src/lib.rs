//! Feature Registry
//!
//! Holds the metadata of a feature project: file data sources, entities and
//! feature views. Objects are kept in memory only.

mod model;
mod registry;

pub use model::{Entity, FeatureView, Field, FileSource, ValueType};
pub use registry::Registry;

use thiserror::Error;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry lock error: {0}")]
    Lock(String),
    #[error("Data source not found: {0}")]
    UnknownDataSource(String),
    #[error("Entity not found: {0}")]
    UnknownEntity(String),
    #[error("Feature view not found: {0}")]
    UnknownFeatureView(String),
    #[error("Invalid {kind} definition: {reason}")]
    InvalidDefinition { kind: &'static str, reason: String },
}
