//! Historical Feature Pipeline
//!
//! Prepares the training table, registers it as a feature view and fetches
//! its historical feature values in batches.

mod config;

pub use self::config::{PipelineConfig, ENV_PREFIX};

use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use dataset::{DatasetError, CREATED_COLUMN, CUSTOMER_ID_COLUMN, TIMESTAMP_COLUMN};
use feature_registry::{Entity, FeatureView, FileSource, Registry, RegistryError, ValueType};
use historical_fetcher::{project_columns, BatchedHistoricalFetcher, FetchError};
use offline_store::{FileOfflineStore, EVENT_TIMESTAMP_COLUMN};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Logging setup failed: {0}")]
    Logging(String),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// Initialize logging
pub fn init_logging(level: &str) -> Result<(), PipelineError> {
    let level = level
        .parse::<Level>()
        .map_err(|e| PipelineError::Logging(format!("log level '{}': {}", level, e)))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}

/// Synthesize the training table from CSV and write it as Parquet
pub fn prepare_training_data(config: &PipelineConfig) -> Result<RecordBatch, PipelineError> {
    let frame = dataset::load_csv(&config.csv_path)?;
    let table = dataset::synthesize(&frame, Utc::now(), config.customer_id)?;
    dataset::write_parquet(&table, &config.parquet_path)?;

    info!("Training table: {} rows", table.num_rows());
    for field in table.schema().fields() {
        info!("  {}: {}", field.name(), field.data_type());
    }
    Ok(table)
}

/// Register the training source, customer entity and training feature view
pub fn register_training_view(
    registry: &Registry,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    registry.apply_data_source(
        FileSource::new(&config.source_name, &config.parquet_path, TIMESTAMP_COLUMN)
            .with_created_timestamp_column(CREATED_COLUMN),
    )?;
    registry.apply_entity(Entity::new(&config.entity_name, &[CUSTOMER_ID_COLUMN]))?;

    let ttl_secs = config.ttl_hours.checked_mul(3600).ok_or_else(|| {
        PipelineError::InvalidConfig(format!("ttl_hours {} is too large", config.ttl_hours))
    })?;
    let view = config.features.iter().fold(
        FeatureView::new(&config.feature_view, &config.source_name)
            .with_entity(&config.entity_name)
            .with_ttl(Duration::from_secs(ttl_secs))
            .with_field(CUSTOMER_ID_COLUMN, ValueType::Int64),
        |view, feature| view.with_field(feature, ValueType::Float64),
    );
    registry.apply_feature_view(
        view.with_online(true)
            .with_tag("team", "training"),
    )?;
    Ok(())
}

/// `<kind>/<name>` lines describing the registry content
pub fn registry_listing(registry: &Registry) -> Result<Vec<String>, PipelineError> {
    let mut lines = Vec::new();
    for source in registry.list_data_sources()? {
        lines.push(format!("FileSource/{}", source.name));
    }
    for entity in registry.list_entities()? {
        lines.push(format!("Entity/{}", entity.name));
    }
    for view in registry.list_feature_views()? {
        lines.push(format!("FeatureView/{}", view.name));
    }
    Ok(lines)
}

/// Run the whole pipeline and return the fetched historical table
pub async fn run(config: &PipelineConfig) -> Result<RecordBatch, PipelineError> {
    let training = prepare_training_data(config)?;

    let registry = Arc::new(Registry::new(&config.project));
    let store = FileOfflineStore::new(Arc::clone(&registry));
    register_training_view(&registry, config)?;

    info!("Registry content:");
    for line in registry_listing(&registry)? {
        info!("  {}", line);
    }

    let entities = dataset::entity_rows(&training, CUSTOMER_ID_COLUMN, TIMESTAMP_COLUMN)?;
    let fetcher =
        BatchedHistoricalFetcher::with_batch_size(store, &config.feature_view, config.batch_size)?;
    let fetched = fetcher.fetch(&entities, &config.features).await?;

    let mut columns = vec![CUSTOMER_ID_COLUMN, EVENT_TIMESTAMP_COLUMN];
    columns.extend(config.features.iter().map(String::as_str));
    let table = if fetched.num_columns() == 0 {
        fetched
    } else {
        project_columns(&fetched, &columns)?
    };

    info!("Fetched {} historical records", table.num_rows());
    Ok(table)
}

/// Render the first `rows` rows of `table`
pub fn preview(table: &RecordBatch, rows: usize) -> Result<String, PipelineError> {
    let head = table.slice(0, rows.min(table.num_rows()));
    Ok(arrow::util::pretty::pretty_format_batches(&[head])?.to_string())
}
