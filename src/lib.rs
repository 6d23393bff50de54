// SPDX-License-Identifier: GPL-3.0-only

//! Basic Camera - capture session core for a photo and video camera
//!
//! This library drives a platform capture framework through a small, guarded
//! state machine: camera switching, flash, photo capture, movie recording and
//! the handoff of finished media to a review stage.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Actor that owns the state machine and serializes gestures
//! - [`backends`]: Capture framework abstraction and a simulated framework
//! - [`capture`]: Capture state, state machine, recording timer, handoff
//! - [`session`]: Session ownership, device inputs and output switching
//! - [`permissions`]: Camera and microphone authorization gate
//! - [`review`]: Playback of captured media and the library save
//! - [`config`]: Runtime settings
//! - [`errors`]: Error taxonomy
//!
//! # Example
//!
//! ```ignore
//! let (handoff, mut review) = MediaHandoff::channel();
//! let (mut machine, mut completions) =
//!     CaptureStateMachine::start(Box::new(SimulatedBackend::new()), Config::default(), handoff)
//!         .await?;
//! machine.capture_photo().await?;
//! machine.await_completion(&mut completions).await?;
//! ```

pub mod app;
pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod permissions;
pub mod review;
pub mod session;

// Re-export commonly used types
pub use app::{AppEvent, AppHandle, Message};
pub use capture::{CaptureStateMachine, CapturedMedia, MediaHandoff};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use review::{ReviewPlaybackController, SaveOutcome};
