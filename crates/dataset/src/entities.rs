//! Entity Row Extraction

use crate::error::DatasetError;
use arrow::array::{Array, ArrayRef, Int64Array, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use offline_store::EntityRow;
use tracing::debug;

/// Build one entity row per table row from its id and event time columns
///
/// Fails before producing anything if either column is missing, not
/// convertible, or contains nulls.
pub fn entity_rows(
    table: &RecordBatch,
    entity_column: &str,
    timestamp_column: &str,
) -> Result<Vec<EntityRow>, DatasetError> {
    let ids = column_as(table, entity_column, &DataType::Int64)?;
    let ids = ids
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| DatasetError::MissingColumn(entity_column.to_string()))?;

    let timestamps = column_as(
        table,
        timestamp_column,
        &DataType::Timestamp(TimeUnit::Microsecond, None),
    )?;
    let timestamps = timestamps
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| DatasetError::MissingColumn(timestamp_column.to_string()))?;

    let rows = (0..table.num_rows())
        .map(|row| {
            if ids.is_null(row) {
                return Err(DatasetError::NullValue {
                    column: entity_column.to_string(),
                    row,
                });
            }
            if timestamps.is_null(row) {
                return Err(DatasetError::NullValue {
                    column: timestamp_column.to_string(),
                    row,
                });
            }
            let micros = timestamps.value(row);
            let event_timestamp = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| DatasetError::TimestampOutOfRange(micros.to_string()))?;
            Ok(EntityRow::new(ids.value(row), event_timestamp))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Built {} entity rows from {}", rows.len(), timestamp_column);
    Ok(rows)
}

fn column_as(table: &RecordBatch, name: &str, data_type: &DataType) -> Result<ArrayRef, DatasetError> {
    let column = table
        .column_by_name(name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
    cast(column.as_ref(), data_type).map_err(|_| DatasetError::MissingColumn(name.to_string()))
}
