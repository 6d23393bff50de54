// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera application
//!
//! Faults fall into two families. Setup and permission faults are fatal: the
//! application cannot do anything useful without a camera, so the binary
//! terminates on them. Everything that happens once the session is running
//! (photo encoding, recording writes, library saves, rejected transitions) is
//! recoverable and leaves the state machine in a consistent state.

use crate::backends::types::BackendError;
use crate::capture::state::Phase;
use crate::permissions::AuthorizationKind;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Capture session could not be assembled
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),
    /// Camera or microphone access refused
    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),
    /// Operation not valid in the current state
    #[error("Transition rejected: {0}")]
    Transition(#[from] TransitionError),
    /// Photo capture errors
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),
    /// Recording-related errors
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),
    /// Library save errors
    #[error("Save error: {0}")]
    Save(#[from] SaveError),
    /// A mid-session input or output swap was refused; the previous
    /// configuration was restored
    #[error("Reconfiguration failed: {0}")]
    Reconfiguration(#[source] SetupError),
    /// The shared session could not be reached (poisoned lock, lost worker)
    #[error("Session error: {0}")]
    Session(String),
}

impl AppError {
    /// Whether this error must stop the application
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Setup(_) | AppError::Permission(_))
    }
}

/// Faults while assembling the capture session
#[derive(Debug, Error)]
pub enum SetupError {
    /// A required device is missing
    #[error("No {0} device found")]
    DeviceNotFound(&'static str),
    /// The framework refused to wrap a device as an input
    #[error("Could not create {device} input: {source}")]
    InputUnavailable {
        device: &'static str,
        #[source]
        source: BackendError,
    },
    /// The session refused an input
    #[error("Could not add {0} input to capture session")]
    InputRejected(&'static str),
    /// The session refused an output
    #[error("Could not add {0} output to capture session")]
    OutputRejected(&'static str),
}

/// Authorization faults
#[derive(Debug, Error)]
pub enum PermissionError {
    /// The user refused access (now or in the past)
    #[error("{0} access denied")]
    Denied(AuthorizationKind),
    /// Access is blocked by policy
    #[error("{0} access restricted")]
    Restricted(AuthorizationKind),
}

/// Operations rejected by the state machine guards
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The action is not valid in this phase
    #[error("Cannot {action} while {phase}")]
    InvalidState { action: &'static str, phase: Phase },
    /// The session was stopped for review and has not been resumed
    #[error("Cannot {action} while the session is stopped for review")]
    SessionStopped { action: &'static str },
    /// The active camera has no torch
    #[error("Active camera has no torch")]
    TorchUnavailable,
    /// A framework completion arrived that no operation was waiting for
    #[error("Unexpected {0} completion")]
    UnexpectedCompletion(&'static str),
}

/// Photo capture errors
#[derive(Debug, Error)]
pub enum PhotoError {
    /// The framework could not start the capture
    #[error("Capture failed: {0}")]
    CaptureFailed(#[source] BackendError),
    /// The framework reported an encoding failure
    #[error("Encoding failed: {0}")]
    EncodingFailed(#[source] BackendError),
    /// The captured bytes could not be decoded for display
    #[error("Could not decode photo: {0}")]
    DecodeFailed(String),
}

/// Recording-specific errors
#[derive(Debug, Error)]
pub enum RecordingError {
    /// The movie output or microphone could not be attached
    #[error("Movie output unavailable: {0}")]
    OutputUnavailable(#[source] SetupError),
    /// The stale output file could not be removed
    #[error("Could not remove stale recording file: {0}")]
    StaleFile(#[source] std::io::Error),
    /// Failed to start recording
    #[error("Failed to start recording: {0}")]
    StartFailed(#[source] BackendError),
    /// Failed to request finalization
    #[error("Failed to stop recording: {0}")]
    StopFailed(#[source] BackendError),
    /// The writer reported a failure while writing or finalizing
    #[error("Recording write failed: {0}")]
    WriteFailed(#[source] BackendError),
}

/// Library save errors
#[derive(Debug, Error)]
pub enum SaveError {
    /// The library writer failed
    #[error("Could not save to library: {0}")]
    WriteFailed(#[from] std::io::Error),
    /// The save worker disappeared
    #[error("Save task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Session(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let setup: AppError = SetupError::DeviceNotFound("front camera").into();
        assert!(setup.is_fatal());

        let permission: AppError = PermissionError::Denied(AuthorizationKind::Camera).into();
        assert!(permission.is_fatal());

        let transition: AppError = TransitionError::TorchUnavailable.into();
        assert!(!transition.is_fatal());

        let recording: AppError =
            RecordingError::WriteFailed(BackendError::Io("disk full".to_string())).into();
        assert!(!recording.is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = TransitionError::InvalidState {
            action: "switch camera",
            phase: Phase::Recording,
        };
        assert_eq!(err.to_string(), "Cannot switch camera while recording");
        assert_eq!(
            SetupError::DeviceNotFound("microphone").to_string(),
            "No microphone device found"
        );
    }
}
