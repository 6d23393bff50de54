// SPDX-License-Identifier: GPL-3.0-only

//! Messages into and events out of the capture actor

use crate::capture::{MediaKind, SessionSnapshot};
use crate::errors::AppError;
use tokio::sync::oneshot;

/// User gestures and queries
#[derive(Debug)]
pub enum Message {
    // ===== Capture =====
    CapturePhoto,
    ToggleRecording,

    // ===== Camera =====
    SwitchCamera,
    ToggleFlash,

    // ===== Lifecycle =====
    /// Returning from review
    ResumeSession,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// What the actor reports back
#[derive(Debug)]
pub enum AppEvent {
    /// Published after every handled message or completion
    StateChanged(SessionSnapshot),
    /// A capture was handed to review
    Captured(MediaKind),
    /// A recoverable fault; the machine is back in a consistent state
    Error(AppError),
    /// The actor has shut the session down and exited
    Stopped,
}
