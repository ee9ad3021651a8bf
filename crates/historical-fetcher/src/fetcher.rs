//! Batched Historical Fetcher

use crate::accumulator::FetchAccumulator;
use crate::batch::{batch_count, partition};
use crate::FetchError;
use arrow::record_batch::RecordBatch;
use offline_store::{EntityRow, FeatureReference, HistoricalFeatureProvider};
use std::num::NonZeroUsize;
use std::time::Instant;
use tracing::{debug, info};

/// Fetches historical features for many entity rows, one batch at a time
pub struct BatchedHistoricalFetcher<P> {
    provider: P,
    /// Feature view every requested feature belongs to
    feature_view: String,
    /// Entity rows per provider call
    batch_size: NonZeroUsize,
}

impl<P: HistoricalFeatureProvider> BatchedHistoricalFetcher<P> {
    /// Create a new fetcher
    pub fn new(provider: P, feature_view: impl Into<String>, batch_size: NonZeroUsize) -> Self {
        let feature_view = feature_view.into();
        info!(
            "Creating historical fetcher: feature_view={}, batch_size={}",
            feature_view, batch_size
        );
        Self {
            provider,
            feature_view,
            batch_size,
        }
    }

    /// Create a fetcher from an unchecked batch size
    pub fn with_batch_size(
        provider: P,
        feature_view: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self, FetchError> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or(FetchError::InvalidBatchSize)?;
        Ok(Self::new(provider, feature_view, batch_size))
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Fetch `feature_names` for every entity row
    ///
    /// Batches are requested sequentially and their results concatenated in
    /// batch order. The first provider failure aborts the fetch; rows already
    /// fetched are dropped.
    pub async fn fetch<S: AsRef<str>>(
        &self,
        entities: &[EntityRow],
        feature_names: &[S],
    ) -> Result<RecordBatch, FetchError> {
        let start = Instant::now();
        let references = FeatureReference::for_view(&self.feature_view, feature_names);
        let total_batches = batch_count(entities.len(), self.batch_size);

        info!(
            "Fetching {} historical rows from {} in {} batches",
            entities.len(),
            self.feature_view,
            total_batches
        );

        let mut accumulator = FetchAccumulator::new();
        for batch in partition(entities, self.batch_size) {
            info!(
                "Fetching rows from {} to {} (batch {}/{})",
                batch.offset(),
                batch.end(),
                batch.index() + 1,
                total_batches
            );

            let table = self
                .provider
                .get_historical_features(batch.rows(), &references)
                .await?;

            debug!("Batch {} returned {} rows", batch.index(), table.num_rows());
            accumulator = accumulator.append(table)?;
        }

        let table = accumulator.finish()?;
        info!(
            "Fetched {} historical records in {:?}",
            table.num_rows(),
            start.elapsed()
        );
        Ok(table)
    }
}
