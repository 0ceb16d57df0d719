#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the dengue map toolchain.
//!
//! Converts district boundaries, composes the dashboard, produces demo
//! data, refreshes datasets from the open-data portal and starts the web
//! front door.
//!
//! Uses `indicatif-log-bridge` (via [`dengue_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dengue_map_config::Config;
use dengue_map_geography_models::Crs;

#[derive(Parser)]
#[command(name = "dengue_map", about = "Tainan dengue dashboard toolchain")]
struct Cli {
    /// Config file (TOML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a shapefile or `GeoJSON` boundary file to `GeoJSON`
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// CRS assumed when the input declares none (e.g. EPSG:3826)
        #[arg(long)]
        input_crs: Option<Crs>,
        /// CRS of the written file
        #[arg(long)]
        output_crs: Option<Crs>,
    },
    /// Regenerate the map page, shell and behavior script
    Compose {
        /// Rewrite script.js even if it already exists
        #[arg(long)]
        force_script: bool,
    },
    /// Write random demo snapshots to the data directory
    GenerateData {
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Refresh datasets from the open-data portal
    Refresh {
        /// Download `refresh.direct_url` without a browser
        #[arg(long)]
        direct: bool,
        /// Remove plain files from the data directory first
        #[arg(long)]
        purge: bool,
    },
    /// Start the web server
    Serve,
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config as TOML
    Show,
    /// Check directories, map settings and refresh settings
    Validate,
    /// Print one value by dotted key (e.g. map.zoom_start)
    Get { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = dengue_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            input_crs,
            output_crs,
        } => commands::convert(&config, &input, &output, input_crs, output_crs)?,
        Commands::Compose { force_script } => commands::compose(&config, force_script)?,
        Commands::GenerateData { seed } => commands::generate_data(&config, seed)?,
        Commands::Refresh { direct, purge } => {
            commands::refresh(&config, &multi, direct, purge).await?;
        }
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(dengue_map_server::run_server(config))
            })
            .await??;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => print!("{}", config.to_toml_string()?),
            ConfigAction::Validate => commands::validate(&config)?,
            ConfigAction::Get { key } => println!("{}", config.get_value(&key)?),
        },
    }

    Ok(())
}
