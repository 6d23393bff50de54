// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing capture devices
//! - Taking photos
//! - Recording videos
//!
//! Every command runs against the simulated capture framework.

use basic_camera::backends::CaptureBackend;
use basic_camera::backends::simulated::{
    SimulatedAuthorization, SimulatedBackend, SimulatedPlayer,
};
use basic_camera::capture::{
    CameraFacing, CaptureStateMachine, CompletionReceiver, MediaHandoff, ReviewRequest,
};
use basic_camera::config::Config;
use basic_camera::errors::{AppError, AppResult, TransitionError};
use basic_camera::permissions::PermissionGate;
use basic_camera::review::{DirectoryLibrary, ReviewPlaybackController, SaveOutcome};
use basic_camera::session::DeviceInputRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Flags shared by the photo and video commands
#[derive(Debug)]
pub struct CaptureOptions {
    pub facing: CameraFacing,
    pub flash: bool,
    pub save: bool,
    pub library: Option<PathBuf>,
    pub json: bool,
}

/// List all capture devices
pub fn list_devices() -> AppResult<()> {
    let mut backend = SimulatedBackend::new();
    let registry = DeviceInputRegistry::discover(&mut backend)?;

    println!("Available devices:");
    println!();
    for device in registry.devices() {
        println!("  [{}] {} ({})", device.id, device.name, device.position);
        if backend.has_torch(device) {
            println!("      Torch: yes");
        }
    }
    Ok(())
}

struct Capture {
    machine: CaptureStateMachine,
    completions: CompletionReceiver,
    review: mpsc::UnboundedReceiver<ReviewRequest>,
    library: PathBuf,
}

async fn open_session(options: &CaptureOptions) -> AppResult<Capture> {
    let gate = PermissionGate::new(SimulatedAuthorization::granted());
    gate.ensure_capture_authorized().await?;

    let mut config = Config {
        initial_facing: options.facing,
        ..Default::default()
    };
    if let Some(library) = &options.library {
        config.library_dir = library.clone();
    }
    let library = config.library_dir.clone();

    let (handoff, review) = MediaHandoff::channel();
    let (mut machine, completions) =
        CaptureStateMachine::start(Box::new(SimulatedBackend::new()), config, handoff).await?;
    println!("Using camera: {:?}", machine.facing());

    if options.flash {
        match machine.toggle_flash().await {
            Ok(_) => println!("Flash: on"),
            Err(AppError::Transition(TransitionError::TorchUnavailable)) => {
                println!("Flash: not available on this camera");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Capture {
        machine,
        completions,
        review,
        library,
    })
}

/// Take a photo and optionally save it
pub async fn take_photo(options: CaptureOptions) -> AppResult<()> {
    let mut capture = open_session(&options).await?;

    println!("Capturing...");
    capture.machine.capture_photo().await?;
    capture
        .machine
        .await_completion(&mut capture.completions)
        .await?;

    let mut review = open_review(&mut capture).await?;
    if let Some((width, height)) = review.dimensions() {
        println!("Photo captured: {}x{}", width, height);
    }
    finish(capture, &mut review, &options).await
}

/// Record a video for `duration` seconds or until Ctrl+C
pub async fn record_video(options: CaptureOptions, duration: u64) -> AppResult<()> {
    let mut capture = open_session(&options).await?;

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %err, "Ctrl+C handler unavailable");
    }

    println!();
    println!("Recording... (press Ctrl+C to stop early)");
    capture.machine.start_recording().await?;

    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);
    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        if let Some(display) = capture.machine.timer_display() {
            print!("\rRecording: {}", display);
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    println!();

    capture.machine.stop_recording().await?;
    capture
        .machine
        .await_completion(&mut capture.completions)
        .await?;

    let mut review = open_review(&mut capture).await?;
    if let Some(path) = review.video_path() {
        println!("Video recorded: {}", path.display());
    }
    finish(capture, &mut review, &options).await
}

async fn open_review(capture: &mut Capture) -> AppResult<ReviewPlaybackController> {
    let request = capture
        .review
        .recv()
        .await
        .ok_or_else(|| AppError::Session("no media was handed off".to_string()))?;
    let library = Arc::new(DirectoryLibrary::new(capture.library.clone()));
    ReviewPlaybackController::open(request, library, |_| Box::new(SimulatedPlayer::new()))
}

async fn finish(
    mut capture: Capture,
    review: &mut ReviewPlaybackController,
    options: &CaptureOptions,
) -> AppResult<()> {
    if options.save {
        match review.save().await? {
            SaveOutcome::Saved(path) => println!("Saved: {}", path.display()),
            SaveOutcome::AlreadySaved => println!("Already saved"),
        }
    }

    capture.machine.resume_session().await?;
    if options.json {
        match serde_json::to_string_pretty(&capture.machine.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(err) => warn!(error = %err, "Failed to serialize session state"),
        }
    }
    capture.machine.shutdown().await
}
