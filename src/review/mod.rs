// SPDX-License-Identifier: GPL-3.0-only

//! Review stage
//!
//! Shows what was just captured and offers a single save to the library.
//! Photos are decoded once for their dimensions; videos get a player that
//! starts playing immediately, loops back to the start when it ends and
//! pauses while the app is in the background.

pub mod library;

pub use library::{DirectoryLibrary, PhotoLibrary};

use crate::backends::PhotoData;
use crate::capture::{CapturedMedia, MediaKind, ReviewRequest};
use crate::errors::{AppResult, PhotoError, SaveError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Playback surface for a recorded video
pub trait MediaPlayer: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to_start(&mut self);
    fn set_muted(&mut self, muted: bool);
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the library at this path
    Saved(PathBuf),
    /// Already saved earlier; nothing was written
    AlreadySaved,
}

enum Content {
    Photo {
        bytes: Arc<PhotoData>,
        width: u32,
        height: u32,
    },
    Video {
        path: PathBuf,
        player: Box<dyn MediaPlayer>,
        playing: bool,
        muted: bool,
        resume_on_foreground: bool,
    },
}

pub struct ReviewPlaybackController {
    content: Content,
    library: Arc<dyn PhotoLibrary>,
    saved: Option<PathBuf>,
}

impl std::fmt::Debug for ReviewPlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewPlaybackController")
            .field("kind", &self.kind())
            .field("saved", &self.saved)
            .finish()
    }
}

impl ReviewPlaybackController {
    /// Take ownership of a handed-off capture
    ///
    /// `make_player` is only called for videos.
    pub fn open<F>(
        request: ReviewRequest,
        library: Arc<dyn PhotoLibrary>,
        make_player: F,
    ) -> AppResult<Self>
    where
        F: FnOnce(&Path) -> Box<dyn MediaPlayer>,
    {
        let content = match request.media {
            CapturedMedia::Photo(bytes) => {
                let (width, height) = image::load_from_memory(&bytes)
                    .map(|img| (img.width(), img.height()))
                    .map_err(|e| PhotoError::DecodeFailed(e.to_string()))?;
                info!(width, height, "Reviewing photo");
                Content::Photo {
                    bytes: Arc::new(bytes),
                    width,
                    height,
                }
            }
            CapturedMedia::Video(path) => {
                let mut player = make_player(&path);
                player.play();
                info!(path = %path.display(), "Reviewing video");
                Content::Video {
                    path,
                    player,
                    playing: true,
                    muted: false,
                    resume_on_foreground: false,
                }
            }
        };

        Ok(Self {
            content,
            library,
            saved: None,
        })
    }

    pub fn kind(&self) -> MediaKind {
        match self.content {
            Content::Photo { .. } => MediaKind::Photo,
            Content::Video { .. } => MediaKind::Video,
        }
    }

    /// Pixel dimensions of a reviewed photo
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.content {
            Content::Photo { width, height, .. } => Some((width, height)),
            Content::Video { .. } => None,
        }
    }

    pub fn photo_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Photo { bytes, .. } => Some(bytes.as_slice()),
            Content::Video { .. } => None,
        }
    }

    pub fn video_path(&self) -> Option<&Path> {
        match &self.content {
            Content::Video { path, .. } => Some(path),
            Content::Photo { .. } => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.content, Content::Video { playing: true, .. })
    }

    pub fn is_muted(&self) -> bool {
        matches!(self.content, Content::Video { muted: true, .. })
    }

    /// Play or pause; returns whether the video is now playing
    pub fn toggle_playback(&mut self) -> bool {
        let Content::Video {
            player, playing, ..
        } = &mut self.content
        else {
            return false;
        };
        if *playing {
            player.pause();
        } else {
            player.play();
        }
        *playing = !*playing;
        debug!(playing = *playing, "Playback toggled");
        *playing
    }

    /// Returns whether the video is now muted
    pub fn toggle_mute(&mut self) -> bool {
        let Content::Video { player, muted, .. } = &mut self.content else {
            return false;
        };
        *muted = !*muted;
        player.set_muted(*muted);
        *muted
    }

    /// Rewind and wait for the user to press play again
    pub fn on_playback_ended(&mut self) {
        if let Content::Video {
            player, playing, ..
        } = &mut self.content
        {
            player.seek_to_start();
            player.pause();
            *playing = false;
        }
    }

    pub fn on_background(&mut self) {
        if let Content::Video {
            player,
            playing,
            resume_on_foreground,
            ..
        } = &mut self.content
        {
            *resume_on_foreground = *playing;
            if *playing {
                player.pause();
                *playing = false;
            }
        }
    }

    pub fn on_foreground(&mut self) {
        if let Content::Video {
            player,
            playing,
            resume_on_foreground,
            ..
        } = &mut self.content
            && std::mem::take(resume_on_foreground)
        {
            player.play();
            *playing = true;
        }
    }

    /// Whether the save action is still offered
    pub fn can_save(&self) -> bool {
        self.saved.is_none()
    }

    pub fn saved_path(&self) -> Option<&Path> {
        self.saved.as_deref()
    }

    /// Save the item to the library, at most once
    ///
    /// A failed save leaves the action available. After a video is saved
    /// its temporary recording is removed.
    pub async fn save(&mut self) -> AppResult<SaveOutcome> {
        if self.saved.is_some() {
            debug!("Item already saved");
            return Ok(SaveOutcome::AlreadySaved);
        }

        let library = Arc::clone(&self.library);
        let path = match &self.content {
            Content::Photo { bytes, .. } => {
                let bytes = Arc::clone(bytes);
                tokio::task::spawn_blocking(move || library.save_photo(&bytes))
                    .await
                    .map_err(|e| SaveError::TaskFailed(e.to_string()))?
                    .map_err(SaveError::WriteFailed)?
            }
            Content::Video { path, .. } => {
                let source = path.clone();
                tokio::task::spawn_blocking(move || {
                    let saved = library.save_video(&source)?;
                    if let Err(err) = std::fs::remove_file(&source) {
                        warn!(error = %err, path = %source.display(), "Failed to remove temporary recording");
                    }
                    Ok::<_, std::io::Error>(saved)
                })
                .await
                .map_err(|e| SaveError::TaskFailed(e.to_string()))?
                .map_err(SaveError::WriteFailed)?
            }
        };

        info!(path = %path.display(), "Saved to library");
        self.saved = Some(path.clone());
        Ok(SaveOutcome::Saved(path))
    }
}
