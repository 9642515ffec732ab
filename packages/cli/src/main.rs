#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the police data pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`police_data_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the fetch progress bar never fight for the terminal.

mod pipeline;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use police_data_models::config::PipelineConfig;
use police_data_transform::snapshot::{SnapshotManifest, today};

/// Config used when `--config` is not given.
const BUNDLED_CONFIG: &str = include_str!("../../../police_data.toml");

#[derive(Parser)]
#[command(
    name = "police_data_cli",
    about = "Download, tidy, and load street-level police data"
)]
struct Cli {
    /// TOML config file. The bundled `police_data.toml` is used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Date stamped into snapshot file names (YYYY-MM-DD). Defaults to today
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode, fetch every month, and write the raw snapshot and category file
    Download,
    /// Tidy the latest raw snapshot and bulk load it into Postgres
    TransformLoad,
    /// Run download then transform-load, handing the snapshot over directly
    Run,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = police_data_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            PipelineConfig::load(path)?
        }
        None => PipelineConfig::from_toml_str(BUNDLED_CONFIG)?,
    };
    let date = cli.date.unwrap_or_else(today);
    let mut manifest = SnapshotManifest::default();

    let result = match cli.command {
        Commands::Download => pipeline::download(&config, date, &multi, &mut manifest).await,
        Commands::TransformLoad => pipeline::transform_load(&config, date, &mut manifest).await,
        Commands::Run => {
            async {
                log::info!("[1/2] Download");
                pipeline::download(&config, date, &multi, &mut manifest).await?;
                log::info!("[2/2] Transform and load");
                pipeline::transform_load(&config, date, &mut manifest).await
            }
            .await
        }
    };

    if let Err(e) = &result {
        log::error!("Pipeline failed: {e}");
    }

    result
}
