// SPDX-License-Identifier: GPL-3.0-only

//! The capture session
//!
//! [`CaptureSession`] owns the backend together with the device registry
//! and the output switch. It is shared as [`SharedSession`] but only the
//! capture state machine holds it; every structural change goes through a
//! [`Transaction`], which begins configuration when created and commits when
//! dropped, so early returns cannot leave a transaction open.

pub mod devices;
pub mod outputs;

pub use devices::DeviceInputRegistry;
pub use outputs::SessionOutputSwitch;

use crate::backends::{
    BackendResult, CaptureBackend, CaptureDevice, InputHandle, OutputKind, PhotoCallback,
    RecordingCallback, SessionGraph,
};
use crate::capture::state::{CameraFacing, OutputMode};
use crate::errors::{AppError, AppResult, SetupError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Session handle shared between the state machine and its blocking workers
pub type SharedSession = Arc<Mutex<CaptureSession>>;

/// Open configuration block on the backend
///
/// Commits on drop.
pub struct Transaction<'a> {
    backend: &'a mut Box<dyn CaptureBackend>,
}

impl<'a> Transaction<'a> {
    pub fn begin(backend: &'a mut Box<dyn CaptureBackend>) -> Self {
        backend.begin_configuration();
        Self { backend }
    }

    pub fn can_add_input(&self, input: &InputHandle) -> bool {
        self.backend.can_add_input(input)
    }

    pub fn add_input(&mut self, input: &InputHandle) {
        self.backend.add_input(input);
    }

    pub fn remove_input(&mut self, input: &InputHandle) {
        self.backend.remove_input(input);
    }

    pub fn can_add_output(&self, output: OutputKind) -> bool {
        self.backend.can_add_output(output)
    }

    pub fn add_output(&mut self, output: OutputKind) {
        self.backend.add_output(output);
    }

    pub fn remove_output(&mut self, output: OutputKind) {
        self.backend.remove_output(output);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.backend.commit_configuration();
    }
}

/// Backend plus what is attached to it
pub struct CaptureSession {
    backend: Box<dyn CaptureBackend>,
    devices: DeviceInputRegistry,
    outputs: SessionOutputSwitch,
    camera: CameraFacing,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("camera", &self.camera)
            .field("output", &self.outputs.attached())
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    /// Discover devices, attach the camera for `facing` and the photo
    /// output in one transaction, then start the session
    ///
    /// Any failure here is a setup fault.
    pub fn setup(
        mut backend: Box<dyn CaptureBackend>,
        facing: CameraFacing,
    ) -> Result<Self, SetupError> {
        let devices = DeviceInputRegistry::discover(backend.as_mut())?;
        let mut outputs = SessionOutputSwitch::new();

        {
            let mut txn = Transaction::begin(&mut backend);
            devices.attach_camera(&mut txn, None, facing)?;
            outputs.attach(&mut txn, OutputMode::Photo)?;
        }

        backend.start_running();
        info!(facing = ?facing, "Capture session configured");

        Ok(Self {
            backend,
            devices,
            outputs,
            camera: facing,
        })
    }

    /// Swap the camera input
    pub fn select_camera(&mut self, facing: CameraFacing) -> Result<(), SetupError> {
        debug!(from = ?self.camera, to = ?facing, "Swapping camera input");
        let mut txn = Transaction::begin(&mut self.backend);
        self.devices
            .attach_camera(&mut txn, Some(self.camera), facing)?;
        self.camera = facing;
        Ok(())
    }

    /// Swap the output; Video also brings in the microphone
    ///
    /// On failure the photo configuration is restored before the
    /// transaction commits.
    pub fn select_output(&mut self, mode: OutputMode) -> Result<(), SetupError> {
        debug!(mode = ?mode, "Swapping session output");
        let mut txn = Transaction::begin(&mut self.backend);
        self.outputs.attach(&mut txn, mode)?;

        match mode {
            OutputMode::Video => {
                if let Err(err) = self.devices.attach_audio(&mut txn) {
                    warn!(error = %err, "Microphone rejected, restoring photo output");
                    self.outputs.attach(&mut txn, OutputMode::Photo)?;
                    return Err(err);
                }
            }
            OutputMode::Photo => self.devices.detach_audio(&mut txn),
        }
        Ok(())
    }

    pub fn camera(&self) -> CameraFacing {
        self.camera
    }

    pub fn output(&self) -> Option<OutputMode> {
        self.outputs.attached()
    }

    pub fn devices(&self) -> &DeviceInputRegistry {
        &self.devices
    }

    pub fn active_device(&self) -> &CaptureDevice {
        self.devices.active_device(self.camera)
    }

    /// Whether the camera for `facing` has a torch
    pub fn has_torch(&self, facing: CameraFacing) -> bool {
        self.backend.has_torch(self.devices.active_device(facing))
    }

    /// Set the torch on the camera for `facing`
    pub fn set_torch(&mut self, facing: CameraFacing, on: bool) -> BackendResult<()> {
        let device = self.devices.active_device(facing);
        self.backend.set_torch(device, on)
    }

    pub fn capture_photo(&mut self, reply: PhotoCallback) -> BackendResult<()> {
        self.backend.capture_photo(reply)
    }

    pub fn start_recording(&mut self, path: &Path, done: RecordingCallback) -> BackendResult<()> {
        self.backend.start_recording(path, done)
    }

    pub fn stop_recording(&mut self) -> BackendResult<()> {
        self.backend.stop_recording()
    }

    pub fn start_running(&mut self) {
        if !self.backend.is_running() {
            self.backend.start_running();
        }
    }

    pub fn stop_running(&mut self) {
        if self.backend.is_running() {
            self.backend.stop_running();
        }
    }

    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    /// Last committed graph
    pub fn graph(&self) -> SessionGraph {
        self.backend.graph()
    }
}

/// Run `f` against the session on a blocking worker
///
/// The lock is held for the whole closure, so configuration blocks never
/// interleave.
pub async fn on_session<T, F>(session: &SharedSession, f: F) -> AppResult<T>
where
    F: FnOnce(&mut CaptureSession) -> T + Send + 'static,
    T: Send + 'static,
{
    let session = Arc::clone(session);
    tokio::task::spawn_blocking(move || {
        let mut guard = session
            .lock()
            .map_err(|_| AppError::Session("capture session lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    })
    .await?
}
