// SPDX-License-Identifier: GPL-3.0-only

//! Hand captured media to the review stage

use super::state::{CapturedMedia, MediaKind};
use crate::errors::{AppError, AppResult};
use crate::session::SharedSession;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What the review stage receives
#[derive(Debug)]
pub struct ReviewRequest {
    pub media: CapturedMedia,
}

impl ReviewRequest {
    pub fn kind(&self) -> MediaKind {
        self.media.kind()
    }
}

/// Outcome of a successful handoff
#[derive(Debug)]
pub struct Delivered {
    pub kind: MediaKind,
    /// Background session stop; await it before restarting the session
    pub session_stop: JoinHandle<()>,
}

/// One-shot delivery of a finished capture
#[derive(Debug, Clone)]
pub struct MediaHandoff {
    review: mpsc::UnboundedSender<ReviewRequest>,
}

impl MediaHandoff {
    /// Handoff plus the receiving end for the review stage
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReviewRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { review: tx }, rx)
    }

    /// Pass `media` on and stop the session in the background
    ///
    /// The session stop is not awaited; the review stage gets the media
    /// right away. Nothing is stopped when the review stage is gone.
    pub fn deliver(&self, media: CapturedMedia, session: &SharedSession) -> AppResult<Delivered> {
        let kind = media.kind();
        self.review
            .send(ReviewRequest { media })
            .map_err(|_| AppError::Session("review stage is gone".to_string()))?;

        let session = Arc::clone(session);
        let session_stop = tokio::task::spawn_blocking(move || match session.lock() {
            Ok(mut session) => session.stop_running(),
            Err(_) => warn!("Capture session lock poisoned, leaving it running"),
        });
        info!(kind = ?kind, "Media handed to review");
        Ok(Delivered { kind, session_stop })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::SimulatedBackend;
    use crate::capture::state::CameraFacing;
    use crate::session::CaptureSession;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_deliver_stops_session_and_forwards() {
        let backend = SimulatedBackend::new();
        let probe = backend.probe();
        let session: SharedSession = Arc::new(Mutex::new(
            CaptureSession::setup(Box::new(backend), CameraFacing::Back).unwrap(),
        ));
        let (handoff, mut review) = MediaHandoff::channel();

        let delivered = handoff
            .deliver(CapturedMedia::Photo(vec![0xff, 0xd8]), &session)
            .unwrap();
        assert_eq!(delivered.kind, MediaKind::Photo);

        let request = review.recv().await.unwrap();
        assert_eq!(request.kind(), MediaKind::Photo);
        assert_eq!(request.media, CapturedMedia::Photo(vec![0xff, 0xd8]));

        delivered.session_stop.await.unwrap();
        assert!(!probe.is_running());
    }

    #[tokio::test]
    async fn test_deliver_without_review_stage() {
        let backend = SimulatedBackend::new();
        let probe = backend.probe();
        let session: SharedSession = Arc::new(Mutex::new(
            CaptureSession::setup(Box::new(backend), CameraFacing::Back).unwrap(),
        ));
        let (handoff, review) = MediaHandoff::channel();
        drop(review);

        let err = handoff
            .deliver(CapturedMedia::Photo(vec![1]), &session)
            .unwrap_err();
        assert!(matches!(err, AppError::Session(_)));
        assert!(probe.is_running());
    }
}
