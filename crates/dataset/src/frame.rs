//! CSV Training Frame

use crate::error::DatasetError;
use std::path::Path;
use tracing::{debug, info};

/// Numeric training data, stored column by column in file order
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TrainingFrame {
    /// Build a frame from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self, DatasetError> {
        let expected = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        if let Some((name, _)) = columns.iter().find(|(_, values)| values.len() != expected) {
            return Err(DatasetError::MissingColumn(format!(
                "{} (expected {} values)",
                name, expected
            )));
        }

        let (names, columns) = columns.into_iter().unzip();
        Ok(Self { names, columns })
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Iterate `(name, values)` pairs in file order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }
}

/// Load a CSV file with a header row and numeric cells
pub fn load_csv(path: impl AsRef<Path>) -> Result<TrainingFrame, DatasetError> {
    let path = path.as_ref();
    info!("Loading training data from {}", path.display());

    let mut reader = csv::Reader::from_path(path)?;
    let names: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for ((field, name), values) in record.iter().zip(&names).zip(columns.iter_mut()) {
            let value = field.trim().parse::<f64>().map_err(|_| DatasetError::Parse {
                row: row + 1,
                column: name.clone(),
                value: field.to_string(),
            })?;
            values.push(value);
        }
    }

    let frame = TrainingFrame { names, columns };
    debug!(
        "Loaded {} rows x {} columns: {:?}",
        frame.num_rows(),
        frame.num_columns(),
        frame.names
    );
    Ok(frame)
}
