// SPDX-License-Identifier: GPL-3.0-only

//! Simulated media framework
//!
//! An in-process stand-in for the platform camera stack. It keeps a
//! committed and a pending session graph so half-finished configuration is
//! never visible, renders stills with the `image` crate, writes placeholder
//! movie files, and can be told to fail at every point the real framework
//! can. [`SimulatedProbe`] gives tests a view of what was committed.

use super::{
    BackendError, BackendResult, CaptureBackend, CaptureDevice, DevicePosition, InputHandle,
    OutputKind, PhotoCallback, RecordingCallback, SessionGraph,
};
use crate::permissions::{AuthorizationKind, AuthorizationProvider, AuthorizationStatus};
use crate::review::MediaPlayer;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Still size produced by the simulated photo output
const STILL_WIDTH: u32 = 64;
const STILL_HEIGHT: u32 = 48;

/// Bytes appended to a simulated movie per finalize
const MOVIE_HEADER: &[u8] = b"SIMMOV01";

/// Failure injection switches
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Wrapping a device as an input fails
    pub input_creation: bool,
    /// The session refuses new inputs
    pub reject_inputs: bool,
    /// The session refuses the movie file output
    pub reject_movie_output: bool,
    /// The session refuses the photo output
    pub reject_photo_output: bool,
    /// The photo output reports an encoding error
    pub photo_encoding: bool,
    /// The movie writer refuses to start
    pub recording_start: bool,
    /// The movie writer refuses a stop request and keeps writing
    pub recording_stop_refused: bool,
    /// The movie writer fails while finalizing
    pub recording_finalize: bool,
}

#[derive(Debug)]
struct SimDevice {
    device: CaptureDevice,
    torch: bool,
    torch_on: bool,
}

#[derive(Debug)]
struct ActiveRecording {
    path: PathBuf,
    done: Option<RecordingCallback>,
}

#[derive(Debug, Default)]
struct SimState {
    devices: Vec<SimDevice>,
    committed: SessionGraph,
    pending: Option<SessionGraph>,
    commits: Vec<SessionGraph>,
    running: bool,
    recording: Option<ActiveRecording>,
    faults: Faults,
    photos_taken: usize,
}

impl SimState {
    fn working_graph(&mut self) -> &mut SessionGraph {
        match self.pending {
            Some(ref mut graph) => graph,
            None => &mut self.committed,
        }
    }

    /// Record an implicit commit for changes made outside a transaction
    fn note_change(&mut self) {
        if self.pending.is_none() {
            self.commits.push(self.committed.clone());
        }
    }

    fn active_camera(&self) -> Option<DevicePosition> {
        self.committed
            .camera_inputs()
            .next()
            .map(|input| input.position)
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process capture framework
#[derive(Debug)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    /// A phone-like device set: back camera with torch, front camera
    /// without, and a microphone
    pub fn new() -> Self {
        let devices = [
            (DevicePosition::Back, "Back Wide Camera", true),
            (DevicePosition::Front, "Front Camera", false),
            (DevicePosition::Microphone, "iPhone Microphone", false),
        ]
        .into_iter()
        .enumerate()
        .map(|(index, (position, name, torch))| SimDevice {
            device: CaptureDevice {
                id: format!("sim-{index}"),
                name: name.to_string(),
                position,
            },
            torch,
            torch_on: false,
        })
        .collect();

        Self {
            state: Arc::new(Mutex::new(SimState {
                devices,
                ..Default::default()
            })),
        }
    }

    /// Remove the device at `position`
    pub fn without_device(self, position: DevicePosition) -> Self {
        lock(&self.state)
            .devices
            .retain(|dev| dev.device.position != position);
        self
    }

    /// Fit or remove the torch on the device at `position`
    pub fn with_torch(self, position: DevicePosition, torch: bool) -> Self {
        for dev in lock(&self.state).devices.iter_mut() {
            if dev.device.position == position {
                dev.torch = torch;
            }
        }
        self
    }

    pub fn with_faults(self, faults: Faults) -> Self {
        lock(&self.state).faults = faults;
        self
    }

    /// Observation handle that stays valid after the backend is moved into a
    /// session
    pub fn probe(&self) -> SimulatedProbe {
        SimulatedProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl CaptureBackend for SimulatedBackend {
    fn default_device(&self, position: DevicePosition) -> Option<CaptureDevice> {
        lock(&self.state)
            .devices
            .iter()
            .find(|dev| dev.device.position == position)
            .map(|dev| dev.device.clone())
    }

    fn make_input(&mut self, device: &CaptureDevice) -> BackendResult<InputHandle> {
        if lock(&self.state).faults.input_creation {
            return Err(BackendError::DeviceUnavailable(device.name.clone()));
        }
        Ok(InputHandle {
            device_id: device.id.clone(),
            position: device.position,
        })
    }

    fn has_torch(&self, device: &CaptureDevice) -> bool {
        lock(&self.state)
            .devices
            .iter()
            .any(|dev| dev.device.id == device.id && dev.torch)
    }

    fn begin_configuration(&mut self) {
        let mut state = lock(&self.state);
        if state.pending.is_none() {
            state.pending = Some(state.committed.clone());
        }
    }

    fn commit_configuration(&mut self) {
        let mut state = lock(&self.state);
        if let Some(graph) = state.pending.take() {
            debug!(
                inputs = graph.inputs.len(),
                outputs = graph.outputs.len(),
                "Simulated session committed"
            );
            state.committed = graph.clone();
            state.commits.push(graph);
        }
    }

    fn can_add_input(&self, input: &InputHandle) -> bool {
        let mut state = lock(&self.state);
        !state.faults.reject_inputs && !state.working_graph().inputs.contains(input)
    }

    fn add_input(&mut self, input: &InputHandle) {
        let mut state = lock(&self.state);
        let graph = state.working_graph();
        if !graph.inputs.contains(input) {
            graph.inputs.push(input.clone());
        }
        state.note_change();
    }

    fn remove_input(&mut self, input: &InputHandle) {
        let mut state = lock(&self.state);
        state.working_graph().inputs.retain(|i| i != input);
        state.note_change();
    }

    fn can_add_output(&self, output: OutputKind) -> bool {
        let mut state = lock(&self.state);
        let refused = match output {
            OutputKind::Photo => state.faults.reject_photo_output,
            OutputKind::MovieFile => state.faults.reject_movie_output,
        };
        !refused && !state.working_graph().outputs.contains(&output)
    }

    fn add_output(&mut self, output: OutputKind) {
        let mut state = lock(&self.state);
        let graph = state.working_graph();
        if !graph.outputs.contains(&output) {
            graph.outputs.push(output);
        }
        state.note_change();
    }

    fn remove_output(&mut self, output: OutputKind) {
        let mut state = lock(&self.state);
        state.working_graph().outputs.retain(|o| *o != output);
        state.note_change();
    }

    fn graph(&self) -> SessionGraph {
        lock(&self.state).committed.clone()
    }

    fn start_running(&mut self) {
        info!("Simulated session running");
        lock(&self.state).running = true;
    }

    fn stop_running(&mut self) {
        info!("Simulated session stopped");
        lock(&self.state).running = false;
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    fn set_torch(&mut self, device: &CaptureDevice, on: bool) -> BackendResult<()> {
        let mut state = lock(&self.state);
        let dev = state
            .devices
            .iter_mut()
            .find(|dev| dev.device.id == device.id)
            .ok_or_else(|| BackendError::DeviceUnavailable(device.name.clone()))?;
        if !dev.torch {
            return Err(BackendError::TorchNotSupported(device.name.clone()));
        }
        dev.torch_on = on;
        Ok(())
    }

    fn capture_photo(&mut self, reply: PhotoCallback) -> BackendResult<()> {
        let mut state = lock(&self.state);
        if !state.committed.outputs.contains(&OutputKind::Photo) {
            return Err(BackendError::OutputNotAttached(OutputKind::Photo));
        }

        let result = if state.faults.photo_encoding {
            Err(BackendError::Encoding("simulated encoder fault".to_string()))
        } else {
            state.photos_taken += 1;
            render_still(state.active_camera().unwrap_or(DevicePosition::Back))
        };

        // Receiver may be gone if the caller stopped caring
        let _ = reply.send(result);
        Ok(())
    }

    fn start_recording(&mut self, path: &Path, done: RecordingCallback) -> BackendResult<()> {
        let mut state = lock(&self.state);
        if !state.committed.outputs.contains(&OutputKind::MovieFile) {
            return Err(BackendError::OutputNotAttached(OutputKind::MovieFile));
        }
        if state.recording.is_some() {
            return Err(BackendError::RecordingInProgress);
        }
        if state.faults.recording_start {
            return Err(BackendError::Io("simulated writer refused to start".to_string()));
        }

        // The real writer refuses to overwrite an existing file
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(MOVIE_HEADER)?;

        info!(path = %path.display(), "Simulated recording started");
        state.recording = Some(ActiveRecording {
            path: path.to_path_buf(),
            done: Some(done),
        });
        Ok(())
    }

    fn stop_recording(&mut self) -> BackendResult<()> {
        let mut state = lock(&self.state);
        if state.recording.is_none() {
            return Err(BackendError::NoRecordingInProgress);
        }
        if state.faults.recording_stop_refused {
            return Err(BackendError::Io("simulated writer busy".to_string()));
        }
        let fail = state.faults.recording_finalize;
        let Some(mut recording) = state.recording.take() else {
            return Err(BackendError::NoRecordingInProgress);
        };

        let result = if fail {
            Err(BackendError::Io("simulated finalize failure".to_string()))
        } else {
            finalize_movie(&recording.path).map(|()| recording.path.clone())
        };

        if let Some(done) = recording.done.take() {
            let _ = done.send(result);
        }
        Ok(())
    }
}

fn finalize_movie(path: &Path) -> BackendResult<()> {
    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(b"moov")?;
    file.sync_all()?;
    Ok(())
}

/// Render a small gradient tinted by camera position and encode it as JPEG
fn render_still(position: DevicePosition) -> BackendResult<Vec<u8>> {
    let tint: [u8; 3] = match position {
        DevicePosition::Front => [210, 140, 60],
        _ => [60, 140, 210],
    };
    let img = image::RgbImage::from_fn(STILL_WIDTH, STILL_HEIGHT, |x, y| {
        let shade = ((x + y) * 255 / (STILL_WIDTH + STILL_HEIGHT)) as u16;
        image::Rgb(tint.map(|c| ((c as u16 + shade) / 2) as u8))
    });

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .map_err(|e| BackendError::Encoding(e.to_string()))?;
    Ok(bytes)
}

/// Read-only (plus fault injection) view of a [`SimulatedBackend`]
#[derive(Debug, Clone)]
pub struct SimulatedProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedProbe {
    /// Last committed graph
    pub fn graph(&self) -> SessionGraph {
        lock(&self.state).committed.clone()
    }

    /// Every graph that became visible, in order
    pub fn commits(&self) -> Vec<SessionGraph> {
        lock(&self.state).commits.clone()
    }

    /// Whether a transaction is open right now
    pub fn in_transaction(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    pub fn torch_on(&self, position: DevicePosition) -> bool {
        lock(&self.state)
            .devices
            .iter()
            .any(|dev| dev.device.position == position && dev.torch_on)
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.state).recording.is_some()
    }

    pub fn photos_taken(&self) -> usize {
        lock(&self.state).photos_taken
    }

    /// Change fault switches on a live backend
    pub fn set_faults(&self, faults: Faults) {
        lock(&self.state).faults = faults;
    }

    /// Make the movie writer fail on its own, as a full disk would
    pub fn fail_active_recording(&self, reason: &str) -> bool {
        let mut state = lock(&self.state);
        let Some(mut recording) = state.recording.take() else {
            return false;
        };
        warn!(reason, "Simulated recording failure");
        if let Some(done) = recording.done.take() {
            let _ = done.send(Err(BackendError::Io(reason.to_string())));
        }
        true
    }
}

/// Authorization provider with scripted answers
#[derive(Debug, Clone)]
pub struct SimulatedAuthorization {
    statuses: Arc<Mutex<HashMap<AuthorizationKind, AuthorizationStatus>>>,
    prompt_answers: HashMap<AuthorizationKind, bool>,
    prompts: Arc<Mutex<Vec<AuthorizationKind>>>,
}

impl SimulatedAuthorization {
    /// Everything already authorized
    pub fn granted() -> Self {
        Self::with_status(AuthorizationStatus::Authorized)
    }

    /// Every kind starts in `status`; prompts are answered with a grant
    pub fn with_status(status: AuthorizationStatus) -> Self {
        let statuses = [AuthorizationKind::Camera, AuthorizationKind::Microphone]
            .into_iter()
            .map(|kind| (kind, status))
            .collect();
        Self {
            statuses: Arc::new(Mutex::new(statuses)),
            prompt_answers: HashMap::new(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_status(self, kind: AuthorizationKind, status: AuthorizationStatus) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, status);
        self
    }

    /// How the simulated user answers the prompt for `kind`
    pub fn answer_prompt(mut self, kind: AuthorizationKind, grant: bool) -> Self {
        self.prompt_answers.insert(kind, grant);
        self
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> Vec<AuthorizationKind> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuthorizationProvider for SimulatedAuthorization {
    fn status(&self, kind: AuthorizationKind) -> AuthorizationStatus {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(AuthorizationStatus::NotDetermined)
    }

    fn request_access(&self, kind: AuthorizationKind, reply: tokio::sync::oneshot::Sender<bool>) {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(kind);
        let grant = self.prompt_answers.get(&kind).copied().unwrap_or(true);
        let status = if grant {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, status);

        // The real prompt answers later, from another thread
        std::thread::spawn(move || {
            let _ = reply.send(grant);
        });
    }
}

/// Calls a [`SimulatedPlayer`] received, for assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCall {
    Play,
    Pause,
    SeekToStart,
    Mute(bool),
}

/// Media player that only logs what it was asked to do
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlayer {
    calls: Arc<Mutex<Vec<PlayerCall>>>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, call: PlayerCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn play(&mut self) {
        self.push(PlayerCall::Play);
    }

    fn pause(&mut self) {
        self.push(PlayerCall::Pause);
    }

    fn seek_to_start(&mut self) {
        self.push(PlayerCall::SeekToStart);
    }

    fn set_muted(&mut self, muted: bool) {
        self.push(PlayerCall::Mute(muted));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn back_input() -> InputHandle {
        InputHandle {
            device_id: "sim-0".to_string(),
            position: DevicePosition::Back,
        }
    }

    #[test]
    fn test_pending_changes_hidden_until_commit() {
        let mut backend = SimulatedBackend::new();
        let probe = backend.probe();

        backend.begin_configuration();
        backend.add_input(&back_input());
        backend.add_output(OutputKind::Photo);
        assert!(probe.graph().inputs.is_empty());
        assert!(probe.in_transaction());

        backend.commit_configuration();
        assert_eq!(probe.graph().inputs, vec![back_input()]);
        assert_eq!(probe.graph().outputs, vec![OutputKind::Photo]);
        assert_eq!(probe.commits().len(), 1);
    }

    #[test]
    fn test_photo_requires_photo_output() {
        let mut backend = SimulatedBackend::new();
        let (tx, _rx) = tokio::sync::oneshot::channel();
        assert_eq!(
            backend.capture_photo(tx),
            Err(BackendError::OutputNotAttached(OutputKind::Photo))
        );
    }

    #[test]
    fn test_still_is_jpeg() {
        let bytes = render_still(DevicePosition::Front).unwrap();
        assert_eq!(
            image::guess_format(&bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_torch_only_on_fitted_devices() {
        let mut backend = SimulatedBackend::new();
        let probe = backend.probe();
        let back = backend.default_device(DevicePosition::Back).unwrap();
        let front = backend.default_device(DevicePosition::Front).unwrap();

        assert!(backend.has_torch(&back));
        assert!(!backend.has_torch(&front));
        assert!(backend.set_torch(&back, true).is_ok());
        assert!(probe.torch_on(DevicePosition::Back));
        assert!(matches!(
            backend.set_torch(&front, true),
            Err(BackendError::TorchNotSupported(_))
        ));
    }

    #[test]
    fn test_refused_stop_keeps_writer_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        let mut backend = SimulatedBackend::new().with_faults(Faults {
            recording_stop_refused: true,
            ..Default::default()
        });
        let probe = backend.probe();
        backend.add_output(OutputKind::MovieFile);
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        backend.start_recording(&path, tx).unwrap();

        assert!(matches!(backend.stop_recording(), Err(BackendError::Io(_))));
        assert!(probe.is_recording());
        assert!(rx.try_recv().is_err());

        probe.set_faults(Faults::default());
        backend.stop_recording().unwrap();
        assert_eq!(rx.try_recv().unwrap(), Ok(path));
    }

    #[test]
    fn test_photo_output_rejection() {
        let backend = SimulatedBackend::new().with_faults(Faults {
            reject_photo_output: true,
            ..Default::default()
        });
        assert!(!backend.can_add_output(OutputKind::Photo));
        assert!(backend.can_add_output(OutputKind::MovieFile));
    }

    #[test]
    fn test_writer_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mov");
        std::fs::write(&path, b"stale").unwrap();

        let mut backend = SimulatedBackend::new();
        backend.add_output(OutputKind::MovieFile);
        let (tx, _rx) = tokio::sync::oneshot::channel();
        assert!(matches!(
            backend.start_recording(&path, tx),
            Err(BackendError::Io(_))
        ));
    }
}
