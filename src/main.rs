// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "insight-camera")]
#[command(about = "Capture or load a photo and have it classified and described")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse an image file
    Analyze {
        /// Image file to analyse
        file: PathBuf,

        /// Print the final analysis state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take a photo and analyse it
    Snap {
        /// V4L2 device path (default from config, usually /dev/video0)
        #[arg(short, long)]
        device: Option<String>,

        /// Save the capture (default: ~/Pictures/insight-camera)
        #[arg(short, long, value_name = "DIR")]
        save: Option<Option<PathBuf>>,

        /// Print the final analysis state as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available cameras
    List,

    /// Show the resolved configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=insight_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, json } => cli::analyze_file(file, json),
        Commands::Snap { device, save, json } => {
            let save = save.map(|dir| dir.unwrap_or_else(cli::default_save_dir));
            cli::snap(device, save, json)
        }
        Commands::List => cli::list_cameras(),
        Commands::Config => cli::show_config(),
    }
}
