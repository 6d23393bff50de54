// SPDX-License-Identifier: GPL-3.0-only

//! Capture state, the state machine that drives the session, the recording
//! timer and the handoff to review

pub mod handoff;
pub mod state;
pub mod state_machine;
pub mod timer;

pub use handoff::{Delivered, MediaHandoff, ReviewRequest};
pub use state::{
    CameraFacing, CapturedMedia, Completion, FlashState, MediaKind, OutputMode, Phase,
    RecordingState, SessionSnapshot,
};
pub use state_machine::{CaptureStateMachine, CompletionReceiver};
pub use timer::{RecordingTimer, format_elapsed};
