// SPDX-License-Identifier: GPL-3.0-only

//! Capture state machine
//!
//! Owns the user-visible capture state (camera, output mode, flash, recording)
//! and drives the shared [`CaptureSession`] through guarded transitions.
//!
//! ```text
//!          capture_photo                 start_recording
//!   Ready ───────────────► CapturingPhoto   Ready ───────────► Recording
//!     ▲                          │            ▲                    │
//!     │   photo completion       │            │                    │ stop_recording
//!     └──────────────────────────┘            │                    ▼
//!                                             └──── completion ── Finalizing
//! ```
//!
//! Framework callbacks never mutate the machine directly. They arrive on the
//! [`CompletionReceiver`] and whoever drives the machine hands them back
//! through [`CaptureStateMachine::handle_completion`], so every mutation runs
//! on the driver's task.

use super::handoff::{Delivered, MediaHandoff};
use super::state::{
    CameraFacing, CapturedMedia, Completion, FlashState, MediaKind, OutputMode, Phase,
    RecordingState, SessionSnapshot,
};
use super::timer::RecordingTimer;
use crate::backends::{BackendError, BackendResult, CaptureBackend, SessionGraph};
use crate::config::Config;
use crate::errors::{
    AppError, AppResult, PhotoError, RecordingError, SetupError, TransitionError,
};
use crate::session::{CaptureSession, SharedSession, on_session};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Receiving end of framework completions
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl CompletionReceiver {
    /// Next completion, `None` once the machine is gone
    pub async fn recv(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }
}

#[derive(Debug)]
pub struct CaptureStateMachine {
    session: SharedSession,
    config: Config,
    handoff: MediaHandoff,
    completions: mpsc::UnboundedSender<Completion>,
    facing: CameraFacing,
    mode: OutputMode,
    /// User preference; survives camera switches
    flash: FlashState,
    torch_available: bool,
    recording: RecordingState,
    phase: Phase,
    timer: RecordingTimer,
    /// Set while the session is stopped for review
    review_stop: Option<JoinHandle<()>>,
}

impl CaptureStateMachine {
    /// Configure the session on `backend` and start it
    ///
    /// Setup faults are fatal and returned as [`AppError::Setup`].
    pub async fn start(
        backend: Box<dyn CaptureBackend>,
        config: Config,
        handoff: MediaHandoff,
    ) -> AppResult<(Self, CompletionReceiver)> {
        let facing = config.initial_facing;
        let session =
            tokio::task::spawn_blocking(move || CaptureSession::setup(backend, facing)).await??;
        let session: SharedSession = Arc::new(Mutex::new(session));
        let torch_available = on_session(&session, move |s| s.has_torch(facing)).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let timer = RecordingTimer::new(config.timer_tick());
        info!(facing = ?facing, torch_available, "Capture state machine ready");

        let machine = Self {
            session,
            config,
            handoff,
            completions: tx,
            facing,
            mode: OutputMode::Photo,
            flash: FlashState::Off,
            torch_available,
            recording: RecordingState::Idle,
            phase: Phase::Ready,
            timer,
            review_stop: None,
        };
        Ok((machine, CompletionReceiver { rx }))
    }

    fn require(&self, action: &'static str, allowed: &[Phase]) -> Result<(), TransitionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            debug!(action, phase = %self.phase, "Transition rejected");
            Err(TransitionError::InvalidState {
                action,
                phase: self.phase,
            })
        }
    }

    fn require_live_session(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.review_stop.is_some() {
            debug!(action, "Session stopped for review");
            return Err(TransitionError::SessionStopped { action });
        }
        Ok(())
    }

    /// Toggle between front and back camera
    ///
    /// Only allowed while idle in photo mode. The torch of the outgoing
    /// camera is switched off and the flash preference is reapplied to the
    /// new one if it has a torch.
    pub async fn switch_camera(&mut self) -> AppResult<CameraFacing> {
        self.require("switch camera", &[Phase::Ready])?;

        let from = self.facing;
        let to = from.toggled();
        let flash_on = self.flash.is_on();
        let torch_available = on_session(&self.session, move |s| -> Result<bool, SetupError> {
            if s.has_torch(from)
                && let Err(err) = s.set_torch(from, false)
            {
                warn!(error = %err, "Failed to turn off torch on outgoing camera");
            }

            s.select_camera(to)?;

            if !s.has_torch(to) {
                return Ok(false);
            }
            match s.set_torch(to, flash_on) {
                Ok(()) => Ok(true),
                Err(err) => {
                    warn!(error = %err, "Failed to apply flash on new camera");
                    Ok(false)
                }
            }
        })
        .await?
        .map_err(AppError::Reconfiguration)?;

        self.facing = to;
        self.torch_available = torch_available;
        info!(facing = ?to, torch_available, "Switched camera");
        Ok(to)
    }

    /// Toggle the flash preference and drive the torch
    ///
    /// Allowed in every phase. Rejected when the active camera has no torch.
    pub async fn toggle_flash(&mut self) -> AppResult<FlashState> {
        if !self.torch_available {
            return Err(TransitionError::TorchUnavailable.into());
        }

        let next = self.flash.toggled();
        let facing = self.facing;
        let applied = on_session(&self.session, move |s| s.set_torch(facing, next.is_on())).await?;
        if let Err(err) = applied {
            warn!(error = %err, "Torch refused, disabling flash control");
            self.torch_available = false;
            return Err(TransitionError::TorchUnavailable.into());
        }

        self.flash = next;
        info!(flash = ?next, "Flash toggled");
        Ok(next)
    }

    /// Request a still from the photo output
    ///
    /// The encoded photo arrives later as a [`Completion::Photo`]. Rejected
    /// after a handoff until [`resume_session`](Self::resume_session) runs.
    /// A photo output lost by an earlier failed restore is attached again
    /// first.
    pub async fn capture_photo(&mut self) -> AppResult<()> {
        self.require("capture a photo", &[Phase::Ready])?;
        self.require_live_session("capture a photo")?;
        if self.mode != OutputMode::Photo {
            self.restore_photo_output().await?;
        }

        let (tx, rx) = oneshot::channel();
        on_session(&self.session, move |s| s.capture_photo(tx))
            .await?
            .map_err(PhotoError::CaptureFailed)?;

        self.phase = Phase::CapturingPhoto;
        self.forward(rx, Completion::Photo);
        debug!("Photo requested");
        Ok(())
    }

    /// Switch to the movie output and begin writing the temporary file
    ///
    /// Any failure restores photo mode and leaves no timer running.
    pub async fn start_recording(&mut self) -> AppResult<()> {
        self.require("start recording", &[Phase::Ready])?;
        self.require_live_session("start recording")?;

        on_session(&self.session, |s| s.select_output(OutputMode::Video))
            .await?
            .map_err(RecordingError::OutputUnavailable)?;
        self.mode = OutputMode::Video;

        let path = self.config.recording_path();
        let (tx, rx) = oneshot::channel();
        let target = path.clone();
        let started = on_session(&self.session, move |s| -> Result<(), RecordingError> {
            remove_stale_recording(&target)?;
            s.start_recording(&target, tx)
                .map_err(RecordingError::StartFailed)
        })
        .await
        .and_then(|result| result.map_err(AppError::from));

        if let Err(err) = started {
            warn!(error = %err, "Recording did not start, restoring photo mode");
            if let Err(restore) = self.restore_photo_output().await {
                error!(error = %restore, "Failed to restore photo output");
            }
            return Err(err);
        }

        self.timer.start();
        self.recording = RecordingState::start(path.clone());
        self.phase = Phase::Recording;
        self.forward(rx, Completion::Recording);
        info!(path = %path.display(), "Recording started");
        Ok(())
    }

    /// Hide the timer and ask the writer to finalize
    ///
    /// The finished file arrives later as a [`Completion::Recording`]. A
    /// refused request leaves the recording and its timer running.
    pub async fn stop_recording(&mut self) -> AppResult<()> {
        self.require("stop recording", &[Phase::Recording])?;

        let requested = on_session(&self.session, |s| s.stop_recording()).await?;
        if let Err(err) = requested {
            warn!(error = %err, "Writer refused stop request, still recording");
            return Err(RecordingError::StopFailed(err).into());
        }

        // The writer decides when it is done; whatever it answers comes
        // through the completion channel.
        self.timer.stop();
        self.phase = Phase::Finalizing;

        info!(
            elapsed_secs = self.recording.elapsed_duration(),
            "Recording stop requested"
        );
        Ok(())
    }

    /// Start or stop recording depending on the current phase
    pub async fn toggle_recording(&mut self) -> AppResult<()> {
        if self.phase == Phase::Recording {
            self.stop_recording().await
        } else {
            self.start_recording().await
        }
    }

    /// Apply a framework completion
    ///
    /// Successful captures are handed to review. A completion nobody asked
    /// for is ignored and reported as [`TransitionError::UnexpectedCompletion`].
    pub async fn handle_completion(&mut self, completion: Completion) -> AppResult<MediaKind> {
        match completion {
            Completion::Photo(result) => {
                if self.phase != Phase::CapturingPhoto {
                    warn!(phase = %self.phase, "Ignoring photo completion");
                    return Err(TransitionError::UnexpectedCompletion("photo").into());
                }
                self.phase = Phase::Ready;

                let bytes = result.map_err(|err| {
                    warn!(error = %err, "Photo processing failed");
                    PhotoError::EncodingFailed(err)
                })?;
                info!(bytes = bytes.len(), "Photo captured");
                self.hand_off(CapturedMedia::Photo(bytes))
            }
            Completion::Recording(result) => {
                if !matches!(self.phase, Phase::Recording | Phase::Finalizing) {
                    warn!(phase = %self.phase, "Ignoring recording completion");
                    return Err(TransitionError::UnexpectedCompletion("recording").into());
                }

                // A completion while still recording means the writer gave up
                // on its own
                self.timer.stop();
                let finished = self.recording.stop();
                self.phase = Phase::Ready;
                // Photo mode is retried by the next capture
                if let Err(err) = self.restore_photo_output().await {
                    error!(error = %err, "Failed to restore photo output after recording");
                }

                let path = result.map_err(|err| {
                    warn!(error = %err, "Recording failed");
                    RecordingError::WriteFailed(err)
                })?;

                info!(
                    path = %path.display(),
                    elapsed_secs = finished.elapsed_duration(),
                    "Recording finished"
                );
                self.hand_off(CapturedMedia::Video(path))
            }
        }
    }

    /// Wait for the next completion and apply it
    pub async fn await_completion(
        &mut self,
        completions: &mut CompletionReceiver,
    ) -> AppResult<MediaKind> {
        let completion = completions
            .recv()
            .await
            .ok_or_else(|| AppError::Session("completion channel closed".to_string()))?;
        self.handle_completion(completion).await
    }

    fn hand_off(&mut self, media: CapturedMedia) -> AppResult<MediaKind> {
        let Delivered { kind, session_stop } = self.handoff.deliver(media, &self.session)?;
        self.review_stop = Some(session_stop);
        Ok(kind)
    }

    /// Restart the session after review and put the torch back
    ///
    /// Waits for the stop issued by the handoff so it cannot land after the
    /// restart.
    pub async fn resume_session(&mut self) -> AppResult<()> {
        if let Some(stop) = self.review_stop.take() {
            stop.await?;
        }

        let facing = self.facing;
        let flash_on = self.torch_available && self.flash.is_on();
        on_session(&self.session, move |s| {
            s.start_running();
            if flash_on && let Err(err) = s.set_torch(facing, true) {
                warn!(error = %err, "Failed to restore torch");
            }
        })
        .await?;
        if self.mode != OutputMode::Photo
            && let Err(err) = self.restore_photo_output().await
        {
            warn!(error = %err, "Photo output still unavailable after resume");
        }
        info!("Capture session resumed");
        Ok(())
    }

    /// Stop everything before the process exits
    pub async fn shutdown(&mut self) -> AppResult<()> {
        self.timer.stop();
        if self.phase == Phase::Recording {
            match on_session(&self.session, |s| s.stop_recording()).await? {
                Ok(()) => info!(
                    path = %self.config.recording_path().display(),
                    "Recording stopped for shutdown"
                ),
                Err(err) => warn!(error = %err, "Failed to stop recording during shutdown"),
            }
        }
        let facing = self.facing;
        let torch = self.torch_available;
        on_session(&self.session, move |s| {
            if torch && let Err(err) = s.set_torch(facing, false) {
                warn!(error = %err, "Failed to turn off torch during shutdown");
            }
            s.stop_running();
        })
        .await?;
        info!("Capture session shut down");
        Ok(())
    }

    async fn restore_photo_output(&mut self) -> AppResult<()> {
        on_session(&self.session, |s| s.select_output(OutputMode::Photo))
            .await?
            .map_err(AppError::Reconfiguration)?;
        self.mode = OutputMode::Photo;
        Ok(())
    }

    /// Forward a framework callback into the completion channel
    fn forward<T: Send + 'static>(
        &self,
        rx: oneshot::Receiver<BackendResult<T>>,
        wrap: fn(BackendResult<T>) -> Completion,
    ) {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = rx.await.unwrap_or(Err(BackendError::CallbackDropped));
            if completions.send(wrap(result)).is_err() {
                debug!("State machine gone, dropping completion");
            }
        });
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Effective flash state; Off whenever the camera has no torch
    pub fn flash(&self) -> FlashState {
        if self.torch_available {
            self.flash
        } else {
            FlashState::Off
        }
    }

    /// Flash preference as the user last set it
    pub fn flash_preference(&self) -> FlashState {
        self.flash
    }

    pub fn flash_control_enabled(&self) -> bool {
        self.torch_available
    }

    pub fn recording_state(&self) -> &RecordingState {
        &self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    pub fn recording_path(&self) -> PathBuf {
        self.config.recording_path()
    }

    pub fn timer_display(&self) -> Option<String> {
        self.timer.display()
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn subscribe_timer(&self) -> watch::Receiver<Option<String>> {
        self.timer.subscribe()
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn session_running(&self) -> bool {
        self.session
            .lock()
            .map(|session| session.is_running())
            .unwrap_or(false)
    }

    /// Last committed session graph
    pub fn graph(&self) -> AppResult<SessionGraph> {
        self.session
            .lock()
            .map(|session| session.graph())
            .map_err(|_| AppError::Session("capture session lock poisoned".to_string()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            facing: self.facing,
            mode: self.mode,
            flash: self.flash(),
            flash_control_enabled: self.torch_available,
            recording: self.recording.is_recording(),
            phase: self.phase,
            session_running: self.session_running(),
        }
    }
}

/// Delete a leftover recording; a missing file is fine
fn remove_stale_recording(path: &Path) -> Result<(), RecordingError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale recording");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(RecordingError::StaleFile(err)),
    }
}
