//! Dataset Error Types

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Errors while preparing or reading a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Cell that is not a number
    #[error("Row {row}, column {column}: cannot parse '{value}' as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    /// Required column absent or of the wrong type
    #[error("Missing or mistyped column: {0}")]
    MissingColumn(String),

    /// Column that would be overwritten by a synthesized one
    #[error("Column {0} already exists in the input")]
    DuplicateColumn(String),

    /// Null in a column that must be fully populated
    #[error("Null value in column {column} at row {row}")]
    NullValue { column: String, row: usize },

    /// Timestamp outside the representable range
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}
