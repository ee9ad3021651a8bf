//! Synthesized Columns and Parquet I/O

use crate::error::DatasetError;
use crate::frame::TrainingFrame;
use crate::{CREATED_COLUMN, CUSTOMER_ID_COLUMN, TIMESTAMP_COLUMN};
use arrow::array::{ArrayRef, Float64Array, Int64Array, TimestampMicrosecondArray};
use arrow::compute::concat_batches;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// `count` hourly instants ending at `end`, truncated to whole seconds
pub fn hourly_timestamps(end: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    let end = end.trunc_subsecs(0);
    (0..count)
        .map(|i| end - Duration::hours((count - 1 - i) as i64))
        .collect()
}

/// Add the entity key and hourly event/created timestamps to `frame`
///
/// Columns come out as `customer_id`, `ts`, `created`, then the frame's
/// columns in file order.
pub fn synthesize(
    frame: &TrainingFrame,
    end: DateTime<Utc>,
    customer_id: i64,
) -> Result<RecordBatch, DatasetError> {
    for reserved in [CUSTOMER_ID_COLUMN, TIMESTAMP_COLUMN, CREATED_COLUMN] {
        if frame.column(reserved).is_some() {
            return Err(DatasetError::DuplicateColumn(reserved.to_string()));
        }
    }

    let num_rows = frame.num_rows();
    let timestamps: Vec<i64> = hourly_timestamps(end, num_rows)
        .iter()
        .map(DateTime::timestamp_micros)
        .collect();
    let timestamps: ArrayRef =
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC"));

    let mut columns: Vec<(String, ArrayRef)> = vec![
        (
            CUSTOMER_ID_COLUMN.to_string(),
            Arc::new(Int64Array::from(vec![customer_id; num_rows])) as ArrayRef,
        ),
        (TIMESTAMP_COLUMN.to_string(), Arc::clone(&timestamps)),
        (CREATED_COLUMN.to_string(), timestamps),
    ];
    for (name, values) in frame.columns() {
        let values: ArrayRef = Arc::new(Float64Array::from(values.to_vec()));
        columns.push((name.to_string(), values));
    }

    let batch = RecordBatch::try_from_iter(columns)?;
    debug!(
        "Synthesized {} rows for customer {} ending at {}",
        num_rows,
        customer_id,
        end.trunc_subsecs(0)
    );
    Ok(batch)
}

/// Write `batch` to a Parquet file, creating parent directories
pub fn write_parquet(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<(), DatasetError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let props = WriterProperties::builder().build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    info!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Read a whole Parquet file into one batch
pub fn read_parquet(path: impl AsRef<Path>) -> Result<RecordBatch, DatasetError> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}
