// SPDX-License-Identifier: GPL-3.0-only

//! Capture backend abstraction
//!
//! The platform media framework (device discovery, session graph, photo
//! encoder, movie writer, torch) sits behind [`CaptureBackend`]. The state
//! machine never talks to it directly: it goes through
//! [`crate::session::CaptureSession`], which owns the backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ CaptureStateMachine  │  ← guards, flash, recording lifecycle
//! └──────────┬───────────┘
//!            │ spawn_blocking + mutex
//!            ▼
//! ┌──────────────────────┐
//! │    CaptureSession    │  ← begin/commit transactions
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CaptureBackend Trait │  ← framework boundary
//! └──────────┬───────────┘
//!            ▼
//!       ┌─────────┐
//!       │Simulated│
//!       └─────────┘
//! ```

pub mod simulated;
pub mod types;

pub use types::*;

use std::path::Path;

/// Media framework seen by the capture session
///
/// Structural changes (`add_*`/`remove_*`) made between
/// [`begin_configuration`](Self::begin_configuration) and
/// [`commit_configuration`](Self::commit_configuration) must become visible
/// atomically on commit. Completions are delivered through oneshot callbacks,
/// possibly from another thread.
pub trait CaptureBackend: Send {
    // ===== Discovery =====

    /// Default device at the given position, if the hardware has one
    fn default_device(&self, position: DevicePosition) -> Option<CaptureDevice>;

    /// Wrap a device as a session input
    fn make_input(&mut self, device: &CaptureDevice) -> BackendResult<InputHandle>;

    /// Whether a torch is fitted to the device
    fn has_torch(&self, device: &CaptureDevice) -> bool;

    // ===== Session graph =====

    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self);

    fn can_add_input(&self, input: &InputHandle) -> bool;

    fn add_input(&mut self, input: &InputHandle);

    fn remove_input(&mut self, input: &InputHandle);

    fn can_add_output(&self, output: OutputKind) -> bool;

    fn add_output(&mut self, output: OutputKind);

    fn remove_output(&mut self, output: OutputKind);

    /// Last committed graph
    fn graph(&self) -> SessionGraph;

    // ===== Lifecycle =====

    fn start_running(&mut self);

    fn stop_running(&mut self);

    fn is_running(&self) -> bool;

    // ===== Device control =====

    /// Lock the device and set its torch
    fn set_torch(&mut self, device: &CaptureDevice, on: bool) -> BackendResult<()>;

    // ===== Capture =====

    /// Ask the photo output for a still; the result arrives on `reply`
    fn capture_photo(&mut self, reply: PhotoCallback) -> BackendResult<()>;

    /// Start writing a movie to `path`; `done` fires once finalized or failed
    fn start_recording(&mut self, path: &Path, done: RecordingCallback) -> BackendResult<()>;

    /// Ask the movie writer to finalize the current file
    fn stop_recording(&mut self) -> BackendResult<()>;
}
