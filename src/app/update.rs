// SPDX-License-Identifier: GPL-3.0-only

//! Message handling
//!
//! `update()` routes each message to the matching state machine transition
//! and reports the outcome as [`AppEvent`]s.

use super::CaptureApp;
use super::state::{AppEvent, Message};
use crate::capture::Completion;
use crate::errors::AppResult;
use tracing::{debug, warn};

impl CaptureApp {
    /// Main message handler
    pub(crate) async fn update(&mut self, message: Message) {
        let result = match message {
            // ===== Capture =====
            Message::CapturePhoto => self.machine.capture_photo().await,
            Message::ToggleRecording => self.machine.toggle_recording().await,

            // ===== Camera =====
            Message::SwitchCamera => self.machine.switch_camera().await.map(drop),
            Message::ToggleFlash => self.machine.toggle_flash().await.map(drop),

            // ===== Lifecycle =====
            Message::ResumeSession => self.machine.resume_session().await,
            Message::Snapshot(reply) => {
                let _ = reply.send(self.machine.snapshot());
                return;
            }
            Message::Shutdown => return,
        };
        self.report(result);
    }

    pub(crate) async fn handle_completion(&mut self, completion: Completion) {
        match self.machine.handle_completion(completion).await {
            Ok(kind) => {
                self.emit(AppEvent::Captured(kind));
                self.report(Ok(()));
            }
            Err(err) => self.report(Err(err)),
        }
    }

    fn report(&self, result: AppResult<()>) {
        if let Err(err) = result {
            warn!(error = %err, "Operation failed");
            self.emit(AppEvent::Error(err));
        }
        self.emit(AppEvent::StateChanged(self.machine.snapshot()));
    }

    pub(crate) fn emit(&self, event: AppEvent) {
        if self.events.send(event).is_err() {
            debug!("No event listener");
        }
    }
}
