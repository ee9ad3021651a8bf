//! Named Column Projection

use crate::FetchError;
use arrow::record_batch::RecordBatch;

/// Select and order the columns of `table` by name
pub fn project_columns<S: AsRef<str>>(
    table: &RecordBatch,
    columns: &[S],
) -> Result<RecordBatch, FetchError> {
    let schema = table.schema();
    let indices = columns
        .iter()
        .map(|name| {
            schema
                .index_of(name.as_ref())
                .map_err(|_| FetchError::MissingColumn(name.as_ref().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(table.project(&indices)?)
}
