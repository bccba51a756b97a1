use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use nora_vas::{DataDirectory, Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "nora-vas", version, about = "Predict anaphylaxis severity scores for register cases")]
struct Cli {
    /// Data directory containing config.properties and input/
    data_dir: PathBuf,

    /// Properties file to use instead of <DATA_DIR>/config.properties
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_properties_file(path),
        None => PipelineConfig::from_data_dir(&cli.data_dir),
    }
    .context("could not load the run configuration")?;

    info!("Using data directory {}", cli.data_dir.display());
    let summary = Pipeline::new(DataDirectory::new(&cli.data_dir), config)
        .run()
        .with_context(|| format!("run over {} failed", cli.data_dir.display()))?;

    info!(
        "Classified {} register case(s) from {} training row(s)",
        summary.register_rows_classified, summary.training_rows_kept
    );
    Ok(())
}
