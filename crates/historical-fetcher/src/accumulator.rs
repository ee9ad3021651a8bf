//! Result Accumulation

use crate::FetchError;
use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Accumulates per-batch result tables in arrival order
///
/// Owned by a single fetch loop; `append` consumes and returns the
/// accumulator so it is never shared between batches.
#[derive(Debug, Default)]
pub struct FetchAccumulator {
    schema: Option<SchemaRef>,
    tables: Vec<RecordBatch>,
    num_rows: usize,
}

impl FetchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next batch result; every result must share the first schema
    pub fn append(mut self, table: RecordBatch) -> Result<Self, FetchError> {
        if let Some(schema) = &self.schema {
            if schema.fields() != table.schema().fields() {
                return Err(FetchError::SchemaMismatch {
                    batch: self.tables.len(),
                });
            }
        } else {
            self.schema = Some(table.schema());
        }

        self.num_rows += table.num_rows();
        self.tables.push(table);
        Ok(self)
    }

    /// Rows accumulated so far
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of batch results appended
    pub fn num_batches(&self) -> usize {
        self.tables.len()
    }

    /// Concatenate everything into one table with continuous row positions
    ///
    /// With no appended batches the result is an empty table without columns.
    pub fn finish(self) -> Result<RecordBatch, FetchError> {
        match self.schema {
            Some(schema) => Ok(concat_batches(&schema, &self.tables)?),
            None => Ok(RecordBatch::new_empty(Arc::new(Schema::empty()))),
        }
    }
}
