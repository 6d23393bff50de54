// SPDX-License-Identifier: GPL-3.0-only

//! Capture state types

use crate::backends::types::{BackendResult, PhotoData};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Which physical camera supplies the live input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, serde::Deserialize)]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl CameraFacing {
    /// The other camera
    pub fn toggled(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

/// Which sink is attached to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum OutputMode {
    #[default]
    Photo,
    Video,
}

/// Torch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FlashState {
    #[default]
    Off,
    On,
}

impl FlashState {
    pub fn toggled(self) -> Self {
        match self {
            FlashState::Off => FlashState::On,
            FlashState::On => FlashState::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self == FlashState::On
    }
}

/// Recording state machine
///
/// Recording lasts from the moment the movie writer accepted the start
/// request until it reports completion, finalization included.
#[derive(Debug, Default)]
pub enum RecordingState {
    /// Not recording
    #[default]
    Idle,
    /// Movie writer running or finalizing
    Recording {
        /// When recording started
        start_time: Instant,
        /// Output file path
        file_path: PathBuf,
    },
}

impl RecordingState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording { .. })
    }

    /// Get the recording file path if recording
    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            RecordingState::Idle => None,
            RecordingState::Recording { file_path, .. } => Some(file_path),
        }
    }

    /// Get the elapsed recording duration in whole seconds
    pub fn elapsed_duration(&self) -> u64 {
        match self {
            RecordingState::Idle => 0,
            RecordingState::Recording { start_time, .. } => start_time.elapsed().as_secs(),
        }
    }

    /// Start recording
    pub fn start(file_path: PathBuf) -> Self {
        RecordingState::Recording {
            start_time: Instant::now(),
            file_path,
        }
    }

    /// Stop recording (returns the previous state)
    pub fn stop(&mut self) -> Self {
        std::mem::replace(self, RecordingState::Idle)
    }
}

/// What the state machine is busy with
///
/// Every public operation is guarded by the phase; calls arriving in the
/// wrong phase are rejected with [`crate::errors::TransitionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    /// Idle, photo output attached, nothing in flight
    #[default]
    Ready,
    /// A still was requested and has not come back yet
    CapturingPhoto,
    /// The movie writer is running
    Recording,
    /// Stop was requested, waiting for the writer to finish the file
    Finalizing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Ready => write!(f, "ready"),
            Phase::CapturingPhoto => write!(f, "capturing a photo"),
            Phase::Recording => write!(f, "recording"),
            Phase::Finalizing => write!(f, "finalizing a recording"),
        }
    }
}

/// Kind tag carried alongside captured media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    Photo,
    Video,
}

/// Result of one capture or record cycle
#[derive(Debug, PartialEq, Eq)]
pub enum CapturedMedia {
    /// Encoded still
    Photo(PhotoData),
    /// Finalized movie file
    Video(PathBuf),
}

impl CapturedMedia {
    pub fn kind(&self) -> MediaKind {
        match self {
            CapturedMedia::Photo(_) => MediaKind::Photo,
            CapturedMedia::Video(_) => MediaKind::Video,
        }
    }
}

/// Framework callback forwarded to whoever drives the state machine
#[derive(Debug)]
pub enum Completion {
    /// Photo output finished processing
    Photo(BackendResult<PhotoData>),
    /// Movie writer finished (or failed)
    Recording(BackendResult<PathBuf>),
}

/// Point-in-time view of the machine for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub facing: CameraFacing,
    pub mode: OutputMode,
    /// Effective torch state; always Off on devices without a torch
    pub flash: FlashState,
    pub flash_control_enabled: bool,
    pub recording: bool,
    pub phase: Phase,
    pub session_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_toggle() {
        assert_eq!(CameraFacing::Back.toggled(), CameraFacing::Front);
        assert_eq!(CameraFacing::Back.toggled().toggled(), CameraFacing::Back);
    }

    #[test]
    fn test_recording_state_lifecycle() {
        let mut state = RecordingState::start(PathBuf::from("/tmp/capture.mov"));
        assert!(state.is_recording());
        assert_eq!(state.elapsed_duration(), 0);

        let previous = state.stop();
        assert!(previous.is_recording());
        assert!(!state.is_recording());
        assert!(state.file_path().is_none());
    }

    #[test]
    fn test_media_kind() {
        assert_eq!(CapturedMedia::Photo(vec![1, 2]).kind(), MediaKind::Photo);
        assert_eq!(
            CapturedMedia::Video(PathBuf::from("a.mov")).kind(),
            MediaKind::Video
        );
    }
}
