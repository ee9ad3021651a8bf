//! Historical Feature Fetcher
//!
//! Splits entity rows into fixed-size batches, issues one point-in-time query
//! per batch and concatenates the results in batch order.

mod accumulator;
mod batch;
mod fetcher;
mod projection;

pub use accumulator::FetchAccumulator;
pub use batch::{batch_count, partition, Batch};
pub use fetcher::BatchedHistoricalFetcher;
pub use projection::project_columns;

use arrow::error::ArrowError;
use offline_store::OfflineStoreError;
use thiserror::Error;

/// Errors during a batched fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,
    #[error(transparent)]
    Provider(#[from] OfflineStoreError),
    #[error("Batch {batch} returned a schema that differs from earlier batches")]
    SchemaMismatch { batch: usize },
    #[error("Column not found in fetched table: {0}")]
    MissingColumn(String),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}
