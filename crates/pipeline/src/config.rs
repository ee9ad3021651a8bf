//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides (`FEATURE_PIPELINE_BATCH_SIZE=500`)
pub const ENV_PREFIX: &str = "FEATURE_PIPELINE";

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw training data
    pub csv_path: PathBuf,
    /// Where the synthesized training table is written
    pub parquet_path: PathBuf,

    /// Registry project name
    pub project: String,
    pub source_name: String,
    pub entity_name: String,
    pub feature_view: String,

    /// Features fetched from the feature view
    pub features: Vec<String>,

    /// Entity rows per historical query
    pub batch_size: usize,
    /// Feature view time-to-live in hours (0 = unbounded)
    pub ttl_hours: u64,
    /// Constant id assigned to every training row
    pub customer_id: i64,

    /// Rows printed from the fetched table
    pub preview_rows: usize,
    /// tracing level: trace, debug, info, warn or error
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/train.csv"),
            parquet_path: PathBuf::from("data/train.parquet"),
            project: "feature_repo".to_string(),
            source_name: "train_source".to_string(),
            entity_name: "customer".to_string(),
            feature_view: "training_fv".to_string(),
            features: [
                "distance_from_last_transaction",
                "ratio_to_median_purchase_price",
                "used_chip",
                "used_pin_number",
                "online_order",
                "fraud",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            batch_size: 10_000,
            ttl_hours: 24,
            customer_id: 1,
            preview_rows: 5,
            log_level: "debug".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("feature-pipeline").required(false)),
        };

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("features"),
            )
            .build()?
            .try_deserialize()
    }
}
