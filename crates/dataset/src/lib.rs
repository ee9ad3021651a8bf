//! Training Dataset Preparation
//!
//! Loads numeric training data from CSV, adds an entity key plus hourly
//! event/created timestamps, writes the result as Parquet and extracts the
//! entity rows used for historical retrieval.

mod entities;
mod error;
mod frame;
mod synth;

pub use entities::entity_rows;
pub use error::DatasetError;
pub use frame::{load_csv, TrainingFrame};
pub use synth::{hourly_timestamps, read_parquet, synthesize, write_parquet};

/// Entity key column added to the training data
pub const CUSTOMER_ID_COLUMN: &str = "customer_id";
/// Event time column
pub const TIMESTAMP_COLUMN: &str = "ts";
/// Creation time column
pub const CREATED_COLUMN: &str = "created";
