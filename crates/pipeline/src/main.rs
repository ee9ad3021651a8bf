//! Historical Feature Pipeline - Main Entry Point

use pipeline::{init_logging, preview, run, PipelineConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional config file path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref())?;
    init_logging(&config.log_level)?;

    info!("=== Historical Feature Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let table = run(&config).await?;
    println!("{}", preview(&table, config.preview_rows)?);

    Ok(())
}
