// SPDX-License-Identifier: GPL-3.0-only

//! Capture actor
//!
//! Owns the [`CaptureStateMachine`] on a single task so that gestures and
//! framework completions are applied one at a time, in arrival order.
//!
//! # Architecture
//!
//! ```text
//!   AppHandle ── Message ──►┐
//!                           ├─► CaptureApp::update ──► CaptureStateMachine
//!   framework ─ Completion ►┘                                │
//!                                                            ▼
//!   AppEvent ◄──────────────────────────────── MediaHandoff ──► review
//! ```

mod state;
mod update;

pub use state::{AppEvent, Message};

use crate::backends::CaptureBackend;
use crate::capture::{
    CaptureStateMachine, CompletionReceiver, MediaHandoff, SessionSnapshot,
};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::permissions::{AuthorizationProvider, PermissionGate};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Sending side of the actor
#[derive(Debug, Clone)]
pub struct AppHandle {
    messages: mpsc::UnboundedSender<Message>,
    timer: watch::Receiver<Option<String>>,
}

impl AppHandle {
    pub fn send(&self, message: Message) -> AppResult<()> {
        self.messages
            .send(message)
            .map_err(|_| AppError::Session("capture actor is gone".to_string()))
    }

    /// Current state, as seen by the actor
    pub async fn snapshot(&self) -> AppResult<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Message::Snapshot(tx))?;
        rx.await
            .map_err(|_| AppError::Session("capture actor is gone".to_string()))
    }

    /// Follows the recording timer display
    pub fn timer(&self) -> watch::Receiver<Option<String>> {
        self.timer.clone()
    }
}

/// Running actor: its handle, event stream and task
#[derive(Debug)]
pub struct Launched {
    pub handle: AppHandle,
    pub events: mpsc::UnboundedReceiver<AppEvent>,
    pub task: JoinHandle<()>,
}

pub struct CaptureApp {
    machine: CaptureStateMachine,
    events: mpsc::UnboundedSender<AppEvent>,
}

/// Check permissions, configure the session and start the actor
///
/// Permission and setup faults come back as fatal errors before any task
/// is spawned.
pub async fn launch<P: AuthorizationProvider>(
    backend: Box<dyn CaptureBackend>,
    config: Config,
    permissions: &PermissionGate<P>,
    handoff: MediaHandoff,
) -> AppResult<Launched> {
    permissions.ensure_capture_authorized().await?;
    let (machine, completions) = CaptureStateMachine::start(backend, config, handoff).await?;

    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = AppHandle {
        messages: message_tx,
        timer: machine.subscribe_timer(),
    };

    let app = CaptureApp {
        machine,
        events: event_tx,
    };
    app.emit(AppEvent::StateChanged(app.machine.snapshot()));
    let task = tokio::spawn(app.run(message_rx, completions));
    info!("Capture actor started");

    Ok(Launched {
        handle,
        events: event_rx,
        task,
    })
}

impl CaptureApp {
    async fn run(
        mut self,
        mut messages: mpsc::UnboundedReceiver<Message>,
        mut completions: CompletionReceiver,
    ) {
        loop {
            tokio::select! {
                message = messages.recv() => match message {
                    Some(Message::Shutdown) | None => break,
                    Some(message) => self.update(message).await,
                },
                Some(completion) = completions.recv() => {
                    self.handle_completion(completion).await;
                }
            }
        }

        if let Err(err) = self.machine.shutdown().await {
            warn!(error = %err, "Capture session did not shut down cleanly");
        }
        self.emit(AppEvent::Stopped);
        info!("Capture actor stopped");
    }
}
