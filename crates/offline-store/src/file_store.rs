//! File Offline Store

use crate::source::SourceTable;
use crate::{
    EntityRow, FeatureReference, HistoricalFeatureProvider, OfflineStoreError,
    EVENT_TIMESTAMP_COLUMN,
};
use arrow::array::{Array, ArrayRef, Int64Array, TimestampMicrosecondArray, UInt32Array};
use arrow::compute::{cast, take};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use feature_registry::{FeatureView, FileSource, Registry, ValueType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// A loaded source together with the definition and join key it was indexed with
struct CachedSource {
    source: FileSource,
    join_key: String,
    table: Arc<SourceTable>,
}

/// Offline store answering historical queries from registered file sources
pub struct FileOfflineStore {
    registry: Arc<Registry>,
    /// Loaded sources keyed by data source name
    sources: Mutex<HashMap<String, CachedSource>>,
}

impl FileOfflineStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        info!("Creating file offline store for project '{}'", registry.project());
        Self {
            registry,
            sources: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve references to a single registered feature view
    fn resolve_view(
        &self,
        references: &[FeatureReference],
    ) -> Result<(FeatureView, String), OfflineStoreError> {
        let first = references.first().ok_or(OfflineStoreError::NoFeatures)?;
        if let Some(other) = references
            .iter()
            .find(|r| r.feature_view != first.feature_view)
        {
            return Err(OfflineStoreError::MixedFeatureViews {
                first: first.feature_view.clone(),
                second: other.feature_view.clone(),
            });
        }

        let view = self.registry.get_feature_view(&first.feature_view)?;
        if let Some(unknown) = references.iter().find(|r| view.field(&r.feature_name).is_none()) {
            return Err(OfflineStoreError::UnknownFeature {
                view: view.name.clone(),
                feature: unknown.feature_name.clone(),
            });
        }

        let join_key = self.join_key(&view)?;
        if let Some(reserved) = references
            .iter()
            .find(|r| r.feature_name == join_key || r.feature_name == EVENT_TIMESTAMP_COLUMN)
        {
            return Err(OfflineStoreError::ReservedFeature(reserved.feature_name.clone()));
        }
        Ok((view, join_key))
    }

    fn join_key(&self, view: &FeatureView) -> Result<String, OfflineStoreError> {
        let entity_name = view
            .entities
            .first()
            .ok_or_else(|| OfflineStoreError::MissingJoinKey(view.name.clone()))?;
        let entity = self.registry.get_entity(entity_name)?;
        entity
            .primary_join_key()
            .map(str::to_string)
            .ok_or_else(|| OfflineStoreError::MissingJoinKey(view.name.clone()))
    }

    /// Load (or reuse) the source table backing `view`
    fn source_table(
        &self,
        view: &FeatureView,
        join_key: &str,
    ) -> Result<Arc<SourceTable>, OfflineStoreError> {
        let mut sources = self
            .sources
            .lock()
            .map_err(|e| OfflineStoreError::QueryFailed(format!("Lock error: {}", e)))?;

        // Re-applied sources or entities invalidate the cached index
        let source = self.registry.get_data_source(&view.source)?;
        if let Some(cached) = sources.get(&view.source) {
            if cached.source == source && cached.join_key == join_key {
                return Ok(Arc::clone(&cached.table));
            }
            debug!("Data source {} changed, reloading", source.name);
        }

        let table = Arc::new(SourceTable::load(&source, join_key)?);
        sources.insert(
            view.source.clone(),
            CachedSource {
                source,
                join_key: join_key.to_string(),
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }
}

#[async_trait]
impl HistoricalFeatureProvider for FileOfflineStore {
    async fn get_historical_features(
        &self,
        entity_rows: &[EntityRow],
        feature_references: &[FeatureReference],
    ) -> Result<RecordBatch, OfflineStoreError> {
        let start = Instant::now();
        let (view, join_key) = self.resolve_view(feature_references)?;
        let source = self.source_table(&view, &join_key)?;
        let ttl_us = i64::try_from(view.ttl.as_micros()).unwrap_or(i64::MAX);

        let indices: UInt32Array = entity_rows
            .iter()
            .map(|row| {
                source
                    .lookup(
                        row.entity_id(),
                        row.event_timestamp().timestamp_micros(),
                        ttl_us,
                    )
                    .and_then(|i| u32::try_from(i).ok())
            })
            .collect();

        let mut fields = vec![
            Field::new(join_key.as_str(), DataType::Int64, false),
            Field::new(
                EVENT_TIMESTAMP_COLUMN,
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(
                entity_rows.iter().map(EntityRow::entity_id),
            )),
            Arc::new(
                TimestampMicrosecondArray::from_iter_values(
                    entity_rows
                        .iter()
                        .map(|row| row.event_timestamp().timestamp_micros()),
                )
                .with_timezone("UTC"),
            ),
        ];

        for reference in feature_references {
            let dtype = match view.field(&reference.feature_name).map(|f| f.dtype) {
                Some(ValueType::Int64) => DataType::Int64,
                Some(ValueType::Float64) | None => DataType::Float64,
            };
            let source_column = source
                .table()
                .column_by_name(&reference.feature_name)
                .ok_or_else(|| OfflineStoreError::SourceColumn {
                    column: reference.feature_name.clone(),
                    path: view.source.clone(),
                })?;
            let taken = take(source_column.as_ref(), &indices, None)?;
            columns.push(cast(taken.as_ref(), &dtype)?);
            fields.push(Field::new(reference.feature_name.as_str(), dtype, true));
        }

        let result = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        debug!(
            "Point-in-time join of {} rows against {} ({} matched) in {:?}",
            entity_rows.len(),
            view.name,
            indices.len() - indices.null_count(),
            start.elapsed()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use feature_registry::{Entity, FileSource};
    use parquet::arrow::ArrowWriter;
    use std::path::Path;
    use std::time::Duration;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn write_source(path: &Path) {
        write_source_with_fraud(path, [0.0, 1.0, 0.0]);
    }

    fn write_source_with_fraud(path: &Path, fraud: [f64; 3]) {
        let hours = [0i64, 1, 2];
        let schema = Arc::new(Schema::new(vec![
            Field::new("customer_id", DataType::Int64, false),
            Field::new("ts", DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())), false),
            Field::new(
                "created",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("fraud", DataType::Float64, false),
            Field::new("used_chip", DataType::Float64, false),
        ]));
        let ts: Vec<i64> = hours
            .iter()
            .map(|h| (base_time() + ChronoDuration::hours(*h)).timestamp_micros())
            .collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 1, 1])),
                Arc::new(TimestampMicrosecondArray::from(ts.clone()).with_timezone("UTC")),
                Arc::new(TimestampMicrosecondArray::from(ts).with_timezone("UTC")),
                Arc::new(Float64Array::from(fraud.to_vec())),
                Arc::new(Float64Array::from(vec![1.0, 1.0, 0.0])),
            ],
        )
        .unwrap();

        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn store(path: &Path, ttl: Duration) -> FileOfflineStore {
        FileOfflineStore::new(Arc::new(registry(path, ttl)))
    }

    fn registry(path: &Path, ttl: Duration) -> Registry {
        let registry = Registry::new("test");
        registry
            .apply_data_source(
                FileSource::new("train_source", path, "ts").with_created_timestamp_column("created"),
            )
            .unwrap();
        registry
            .apply_entity(Entity::new("customer", &["customer_id"]))
            .unwrap();
        registry
            .apply_feature_view(
                FeatureView::new("training_fv", "train_source")
                    .with_entity("customer")
                    .with_ttl(ttl)
                    .with_field("customer_id", ValueType::Int64)
                    .with_field("fraud", ValueType::Float64)
                    .with_field("used_chip", ValueType::Float64),
            )
            .unwrap();
        registry
    }

    fn fraud_at(result: &RecordBatch, row: usize) -> f64 {
        result
            .column_by_name("fraud")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .value(row)
    }

    #[tokio::test]
    async fn test_point_in_time_join() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write_source(&path);
        let store = store(&path, Duration::from_secs(3600));

        let rows = vec![
            EntityRow::new(1, base_time() + ChronoDuration::minutes(90)),
            EntityRow::new(1, base_time() - ChronoDuration::hours(1)),
            EntityRow::new(2, base_time()),
            EntityRow::new(1, base_time() + ChronoDuration::hours(5)),
        ];
        let refs = FeatureReference::for_view("training_fv", &["fraud", "used_chip"]);
        let result = store.get_historical_features(&rows, &refs).await.unwrap();

        assert_eq!(result.num_rows(), 4);
        let names: Vec<_> = result
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["customer_id", "event_timestamp", "fraud", "used_chip"]);

        let fraud = result
            .column_by_name("fraud")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        // 01:30 sees the 01:00 row
        assert_eq!(fraud.value(0), 1.0);
        // before any data, unknown entity, and older than the ttl
        assert!(fraud.is_null(1));
        assert!(fraud.is_null(2));
        assert!(fraud.is_null(3));
    }

    #[tokio::test]
    async fn test_unknown_feature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write_source(&path);
        let store = store(&path, Duration::ZERO);

        let refs = FeatureReference::for_view("training_fv", &["nope"]);
        let err = store
            .get_historical_features(&[EntityRow::new(1, base_time())], &refs)
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineStoreError::UnknownFeature { .. }));
    }

    #[tokio::test]
    async fn test_mixed_feature_views_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write_source(&path);
        let store = store(&path, Duration::ZERO);

        let refs = vec![
            FeatureReference::new("training_fv", "fraud"),
            FeatureReference::new("other_fv", "fraud"),
        ];
        let err = store
            .get_historical_features(&[EntityRow::new(1, base_time())], &refs)
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineStoreError::MixedFeatureViews { .. }));
    }

    #[tokio::test]
    async fn test_missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir.path().join("absent.parquet"), Duration::ZERO);

        let refs = FeatureReference::for_view("training_fv", &["fraud"]);
        let err = store
            .get_historical_features(&[EntityRow::new(1, base_time())], &refs)
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineStoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_empty_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write_source(&path);
        let store = store(&path, Duration::ZERO);

        let refs = FeatureReference::for_view("training_fv", &["fraud"]);
        let result = store.get_historical_features(&[], &refs).await.unwrap();
        assert_eq!(result.num_rows(), 0);
        assert_eq!(result.num_columns(), 3);
    }

    #[tokio::test]
    async fn test_reapplied_source_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.parquet");
        let second = dir.path().join("b.parquet");
        write_source_with_fraud(&first, [1.0, 1.0, 1.0]);
        write_source_with_fraud(&second, [2.0, 2.0, 2.0]);

        let registry = Arc::new(registry(&first, Duration::ZERO));
        let store = FileOfflineStore::new(Arc::clone(&registry));
        let rows = [EntityRow::new(1, base_time() + ChronoDuration::hours(2))];
        let refs = FeatureReference::for_view("training_fv", &["fraud"]);

        let before = store.get_historical_features(&rows, &refs).await.unwrap();
        assert_eq!(fraud_at(&before, 0), 1.0);

        // same source, cached index reused
        let again = store.get_historical_features(&rows, &refs).await.unwrap();
        assert_eq!(fraud_at(&again, 0), 1.0);

        registry
            .apply_data_source(
                FileSource::new("train_source", &second, "ts")
                    .with_created_timestamp_column("created"),
            )
            .unwrap();
        let after = store.get_historical_features(&rows, &refs).await.unwrap();
        assert_eq!(fraud_at(&after, 0), 2.0);
    }

    #[tokio::test]
    async fn test_join_key_as_feature_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.parquet");
        write_source(&path);
        let store = store(&path, Duration::ZERO);

        let refs = FeatureReference::for_view("training_fv", &["customer_id", "fraud"]);
        let err = store
            .get_historical_features(&[EntityRow::new(1, base_time())], &refs)
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineStoreError::ReservedFeature(ref f) if f == "customer_id"));
    }
}
