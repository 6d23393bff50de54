// SPDX-License-Identifier: GPL-3.0-only
// Shared types for capture backend abstraction

//! Shared types for capture backends

use serde::Serialize;
use std::path::PathBuf;

/// Physical device position as reported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DevicePosition {
    /// Back-facing wide angle camera
    Back,
    /// Front-facing (selfie) camera
    Front,
    /// Built-in microphone
    Microphone,
}

impl DevicePosition {
    /// Human readable label used in logs and errors
    pub fn label(self) -> &'static str {
        match self {
            DevicePosition::Back => "back camera",
            DevicePosition::Front => "front camera",
            DevicePosition::Microphone => "microphone",
        }
    }
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A capture device discovered by the framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureDevice {
    /// Framework unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    pub position: DevicePosition,
}

/// A device wrapped as something the session can attach
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputHandle {
    /// Identifier of the wrapped device
    pub device_id: String,
    pub position: DevicePosition,
}

impl InputHandle {
    /// Whether the input supplies video
    pub fn is_camera(&self) -> bool {
        self.position != DevicePosition::Microphone
    }
}

/// Output sinks the session can host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputKind {
    /// Still photo encoder
    Photo,
    /// Movie file writer
    MovieFile,
}

impl OutputKind {
    pub fn label(self) -> &'static str {
        match self {
            OutputKind::Photo => "photo",
            OutputKind::MovieFile => "movie file",
        }
    }
}

/// What is attached to the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionGraph {
    pub inputs: Vec<InputHandle>,
    pub outputs: Vec<OutputKind>,
}

impl SessionGraph {
    /// Camera inputs currently attached
    pub fn camera_inputs(&self) -> impl Iterator<Item = &InputHandle> {
        self.inputs.iter().filter(|input| input.is_camera())
    }

    /// Whether the microphone is attached
    pub fn has_audio(&self) -> bool {
        self.inputs.iter().any(|input| !input.is_camera())
    }
}

/// Encoded still delivered by the photo output
pub type PhotoData = Vec<u8>;

/// Reply channel for a photo capture request
pub type PhotoCallback = tokio::sync::oneshot::Sender<BackendResult<PhotoData>>;

/// Reply channel for a recording; fires once the file is finalized or the
/// writer fails
pub type RecordingCallback = tokio::sync::oneshot::Sender<BackendResult<PathBuf>>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Device could not be opened or wrapped
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The required output is not attached
    #[error("No {} output attached", .0.label())]
    OutputNotAttached(OutputKind),
    /// Device has no torch
    #[error("Torch not supported on {0}")]
    TorchNotSupported(String),
    /// Encoder failure
    #[error("Encoding failed: {0}")]
    Encoding(String),
    /// A recording is already running
    #[error("Recording already in progress")]
    RecordingInProgress,
    /// No recording to stop
    #[error("No recording in progress")]
    NoRecordingInProgress,
    /// File system failure in the writer
    #[error("I/O error: {0}")]
    Io(String),
    /// The framework dropped a callback without answering
    #[error("Framework dropped the completion callback")]
    CallbackDropped,
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}
