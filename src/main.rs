// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use viewfinder::backends::camera::CameraBackendManager;
use viewfinder::backends::camera::types::{CameraBackendType, LensFacing};
use viewfinder::config::Config;

mod cli;

#[derive(Parser)]
#[command(name = "viewfinder")]
#[command(about = "Single-screen terminal camera")]
#[command(version = viewfinder::constants::app_version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend to use (overrides the config file)
    #[arg(long, global = true, value_enum)]
    backend: Option<CameraBackendType>,

    /// Preferred lens facing (overrides the config file)
    #[arg(long, global = true, value_enum)]
    facing: Option<LensFacing>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Take a photo
    Photo {
        /// Camera index to use (from 'viewfinder list')
        #[arg(short, long, default_value = "0")]
        camera: usize,

        /// Output file or directory (default: ~/Pictures/Viewfinder/)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=viewfinder=debug, RUST_LOG=info
    init_logging(cli.command.is_none());

    let mut config = Config::load();
    // First run: write the defaults so there is a file to edit
    if Config::config_path().is_some_and(|path| !path.exists())
        && let Err(e) = config.save()
    {
        tracing::warn!(error = %e, "Failed to write default config");
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(facing) = cli.facing {
        config.lens_facing = facing;
    }
    let backend = CameraBackendManager::new(config.backend);

    match cli.command {
        Some(Commands::List) => cli::list_cameras(&backend),
        Some(Commands::Photo { camera, output }) => {
            cli::take_photo(&backend, &config, camera, output)
        }
        None => viewfinder::terminal::run(config, backend),
    }
}

/// The interactive screen owns the terminal, so its logs go to a file
fn init_logging(interactive: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    if interactive && let Some(file) = open_log_file() {
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else if interactive {
        // No log file available; stay silent rather than corrupt the screen
        builder.with_writer(std::io::sink).init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
}

fn open_log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join("viewfinder");
    std::fs::create_dir_all(&dir).ok()?;
    File::options()
        .create(true)
        .append(true)
        .open(dir.join("viewfinder.log"))
        .ok()
}
