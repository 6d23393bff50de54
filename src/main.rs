// SPDX-License-Identifier: GPL-3.0-only

use basic_camera::capture::CameraFacing;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

mod cli;

#[derive(Parser)]
#[command(name = "basic-camera")]
#[command(about = "Drive the camera capture core against the simulated framework")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List capture devices
    Devices,

    /// Take a photo
    Photo {
        /// Use the front camera
        #[arg(long)]
        front: bool,

        /// Turn the torch on before capturing
        #[arg(long)]
        flash: bool,

        /// Save the photo to the library
        #[arg(short, long)]
        save: bool,

        /// Library directory (default: ~/Pictures/basic-camera)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Print the final session state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a video
    Video {
        /// Recording duration in seconds
        #[arg(short, long, default_value = "3")]
        duration: u64,

        /// Use the front camera
        #[arg(long)]
        front: bool,

        /// Turn the torch on while recording
        #[arg(long)]
        flash: bool,

        /// Save the video to the library
        #[arg(short, long)]
        save: bool,

        /// Library directory (default: ~/Pictures/basic-camera)
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Print the final session state as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=basic_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Devices => cli::list_devices(),
            Commands::Photo {
                front,
                flash,
                save,
                library,
                json,
            } => {
                let options = cli::CaptureOptions {
                    facing: facing(front),
                    flash,
                    save,
                    library,
                    json,
                };
                cli::take_photo(options).await
            }
            Commands::Video {
                duration,
                front,
                flash,
                save,
                library,
                json,
            } => {
                let options = cli::CaptureOptions {
                    facing: facing(front),
                    flash,
                    save,
                    library,
                    json,
                };
                cli::record_video(options, duration).await
            }
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_fatal() => {
            error!(error = %err, "Fatal error, exiting");
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn facing(front: bool) -> CameraFacing {
    if front {
        CameraFacing::Front
    } else {
        CameraFacing::Back
    }
}
