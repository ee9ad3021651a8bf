//! Source Table Loading and Point-in-Time Lookup

use crate::OfflineStoreError;
use arrow::array::{Array, ArrayRef, Int64Array, TimestampMicrosecondArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use feature_registry::FileSource;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use tracing::{debug, info, warn};

/// Sort key and position of one source row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SourceRow {
    timestamp_us: i64,
    created_us: i64,
    row: usize,
}

/// A fully loaded data source, indexed by entity id
pub(crate) struct SourceTable {
    table: RecordBatch,
    /// Rows per entity id, ascending by (timestamp, created)
    index: HashMap<i64, Vec<SourceRow>>,
}

impl SourceTable {
    /// Load `source` and index it on `join_key`
    pub(crate) fn load(source: &FileSource, join_key: &str) -> Result<Self, OfflineStoreError> {
        info!("Loading data source {} from {}", source.name, source.path.display());

        let file = File::open(&source.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        let table = concat_batches(&schema, &batches)?;

        Self::from_table(table, source, join_key)
    }

    /// Index an already materialized table
    pub(crate) fn from_table(
        table: RecordBatch,
        source: &FileSource,
        join_key: &str,
    ) -> Result<Self, OfflineStoreError> {
        let path = source.path.display().to_string();
        let keys = typed_column(&table, join_key, &DataType::Int64, &path)?;
        let keys = downcast::<Int64Array>(&keys, join_key, &path)?;

        let timestamp_type = DataType::Timestamp(TimeUnit::Microsecond, None);
        let timestamps = typed_column(&table, &source.timestamp_field, &timestamp_type, &path)?;
        let timestamps =
            downcast::<TimestampMicrosecondArray>(&timestamps, &source.timestamp_field, &path)?;
        let created = match &source.created_timestamp_column {
            Some(column) => {
                let array = typed_column(&table, column, &timestamp_type, &path)?;
                Some(downcast::<TimestampMicrosecondArray>(&array, column, &path)?.clone())
            }
            None => None,
        };

        let mut index: HashMap<i64, Vec<SourceRow>> = HashMap::new();
        let mut skipped = 0usize;
        for row in 0..table.num_rows() {
            if keys.is_null(row) || timestamps.is_null(row) {
                skipped += 1;
                continue;
            }
            let created_us = created
                .as_ref()
                .filter(|c| c.is_valid(row))
                .map(|c| c.value(row))
                .unwrap_or(i64::MIN);
            index.entry(keys.value(row)).or_default().push(SourceRow {
                timestamp_us: timestamps.value(row),
                created_us,
                row,
            });
        }
        for rows in index.values_mut() {
            rows.sort_unstable();
        }

        if skipped > 0 {
            warn!("Skipped {} source rows with a null key or timestamp", skipped);
        }
        debug!(
            "Indexed {} rows for {} entities from {}",
            table.num_rows(),
            index.len(),
            source.name
        );

        Ok(Self { table, index })
    }

    pub(crate) fn table(&self) -> &RecordBatch {
        &self.table
    }

    /// Latest row for `entity_id` not after `event_us` and no older than `ttl_us`
    ///
    /// A `ttl_us` of zero disables the age bound.
    pub(crate) fn lookup(&self, entity_id: i64, event_us: i64, ttl_us: i64) -> Option<usize> {
        let rows = self.index.get(&entity_id)?;
        let end = rows.partition_point(|r| r.timestamp_us <= event_us);
        let candidate = rows[..end].last()?;

        if ttl_us > 0 && candidate.timestamp_us < event_us.saturating_sub(ttl_us) {
            return None;
        }
        Some(candidate.row)
    }
}

fn typed_column(
    table: &RecordBatch,
    name: &str,
    data_type: &DataType,
    path: &str,
) -> Result<ArrayRef, OfflineStoreError> {
    let column = table
        .column_by_name(name)
        .ok_or_else(|| OfflineStoreError::SourceColumn {
            column: name.to_string(),
            path: path.to_string(),
        })?;
    Ok(cast(column.as_ref(), data_type)?)
}

fn downcast<'a, T: 'static>(
    array: &'a ArrayRef,
    name: &str,
    path: &str,
) -> Result<&'a T, OfflineStoreError> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| OfflineStoreError::SourceColumn {
            column: name.to_string(),
            path: path.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    const HOUR_US: i64 = 3_600_000_000;

    fn source() -> FileSource {
        FileSource::new("src", "memory", "ts").with_created_timestamp_column("created")
    }

    fn table(rows: &[(i64, i64, i64, f64)]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("customer_id", DataType::Int64, false),
            Field::new("ts", DataType::Timestamp(TimeUnit::Microsecond, None), false),
            Field::new("created", DataType::Timestamp(TimeUnit::Microsecond, None), false),
            Field::new("value", DataType::Float64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.0))),
                Arc::new(TimestampMicrosecondArray::from_iter_values(rows.iter().map(|r| r.1))),
                Arc::new(TimestampMicrosecondArray::from_iter_values(rows.iter().map(|r| r.2))),
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.3))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_latest_row_not_after_event() {
        let rows = [
            (1, 0, 0, 1.0),
            (1, 2 * HOUR_US, 2 * HOUR_US, 3.0),
            (1, HOUR_US, HOUR_US, 2.0),
        ];
        let source_table = SourceTable::from_table(table(&rows), &source(), "customer_id").unwrap();

        assert_eq!(source_table.lookup(1, HOUR_US + 5, 0), Some(2));
        assert_eq!(source_table.lookup(1, 2 * HOUR_US, 0), Some(1));
        assert_eq!(source_table.lookup(1, -1, 0), None);
        assert_eq!(source_table.lookup(2, HOUR_US, 0), None);
    }

    #[test]
    fn test_ttl_bounds_age() {
        let rows = [(1, 0, 0, 1.0)];
        let source_table = SourceTable::from_table(table(&rows), &source(), "customer_id").unwrap();

        assert_eq!(source_table.lookup(1, HOUR_US, HOUR_US), Some(0));
        assert_eq!(source_table.lookup(1, HOUR_US + 1, HOUR_US), None);
        assert_eq!(source_table.lookup(1, 100 * HOUR_US, 0), Some(0));
    }

    #[test]
    fn test_created_breaks_timestamp_ties() {
        let rows = [(1, HOUR_US, 5, 1.0), (1, HOUR_US, 9, 2.0), (1, HOUR_US, 7, 3.0)];
        let source_table = SourceTable::from_table(table(&rows), &source(), "customer_id").unwrap();

        assert_eq!(source_table.lookup(1, HOUR_US, 0), Some(1));
    }

    #[test]
    fn test_missing_timestamp_column() {
        let rows = [(1, 0, 0, 1.0)];
        let source = FileSource::new("src", "memory", "event_time");
        let result = SourceTable::from_table(table(&rows), &source, "customer_id");

        assert!(matches!(
            result,
            Err(OfflineStoreError::SourceColumn { ref column, .. }) if column == "event_time"
        ));
    }
}
