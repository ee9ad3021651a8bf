//! Offline Store
//!
//! Point-in-time historical feature retrieval. The [`HistoricalFeatureProvider`]
//! trait is the seam batch fetchers call through; [`FileOfflineStore`] answers
//! it from the Parquet files registered as feature view sources.

mod file_store;
mod reference;
mod source;

pub use file_store::FileOfflineStore;
pub use reference::FeatureReference;

use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feature_registry::RegistryError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Name of the request timestamp column in result tables
pub const EVENT_TIMESTAMP_COLUMN: &str = "event_timestamp";

/// Offline store errors
#[derive(Debug, Error)]
pub enum OfflineStoreError {
    #[error("Invalid feature reference '{0}': expected <feature_view>:<feature_name>")]
    InvalidReference(String),
    #[error("No feature references requested")]
    NoFeatures,
    #[error("Feature references span multiple feature views: {first} and {second}")]
    MixedFeatureViews { first: String, second: String },
    #[error("Feature {feature} not found in feature view {view}")]
    UnknownFeature { view: String, feature: String },
    #[error("Feature {0} collides with a result key column")]
    ReservedFeature(String),
    #[error("Feature view {0} has no entity join key")]
    MissingJoinKey(String),
    #[error("Source column {column} missing or not readable in {path}")]
    SourceColumn { column: String, path: String },
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// One request row of a historical retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRow {
    entity_id: i64,
    event_timestamp: DateTime<Utc>,
}

impl EntityRow {
    pub fn new(entity_id: i64, event_timestamp: DateTime<Utc>) -> Self {
        Self {
            entity_id,
            event_timestamp,
        }
    }

    pub fn entity_id(&self) -> i64 {
        self.entity_id
    }

    pub fn event_timestamp(&self) -> DateTime<Utc> {
        self.event_timestamp
    }
}

/// Point-in-time feature retrieval
///
/// Implementations return one row per entity row (or fewer, if the backing
/// store drops unmatched rows) with the requested feature columns appended.
#[async_trait]
pub trait HistoricalFeatureProvider: Send + Sync {
    async fn get_historical_features(
        &self,
        entity_rows: &[EntityRow],
        feature_references: &[FeatureReference],
    ) -> Result<RecordBatch, OfflineStoreError>;
}

#[async_trait]
impl<P: HistoricalFeatureProvider + ?Sized> HistoricalFeatureProvider for std::sync::Arc<P> {
    async fn get_historical_features(
        &self,
        entity_rows: &[EntityRow],
        feature_references: &[FeatureReference],
    ) -> Result<RecordBatch, OfflineStoreError> {
        (**self)
            .get_historical_features(entity_rows, feature_references)
            .await
    }
}
