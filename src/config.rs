// SPDX-License-Identifier: GPL-3.0-only

use crate::capture::state::CameraFacing;
use crate::constants::{LIBRARY_DIR_NAME, RECORDING_FILE_NAME, RECORDING_TICK};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for a capture session
///
/// Nothing here is persisted; the application builds it in code and the
/// command line harness overrides individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Camera selected when the session is first configured
    pub initial_facing: CameraFacing,
    /// Directory holding the temporary recording file
    pub recording_dir: PathBuf,
    /// Name of the temporary recording file
    pub recording_file_name: String,
    /// Where saved photos and videos end up
    pub library_dir: PathBuf,
    /// Recording timer tick in milliseconds
    pub timer_tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_facing: CameraFacing::Back,
            recording_dir: std::env::temp_dir(),
            recording_file_name: RECORDING_FILE_NAME.to_string(),
            library_dir: default_library_dir(),
            timer_tick_ms: RECORDING_TICK.as_millis() as u64,
        }
    }
}

impl Config {
    /// Full path of the temporary recording file
    pub fn recording_path(&self) -> PathBuf {
        self.recording_dir.join(&self.recording_file_name)
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms.max(1))
    }
}

/// `<Pictures>/basic-camera`, falling back to the home directory and then
/// the working directory
pub fn default_library_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LIBRARY_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recording_path() {
        let config = Config::default();
        assert_eq!(
            config.recording_path(),
            std::env::temp_dir().join(RECORDING_FILE_NAME)
        );
        assert_eq!(config.timer_tick(), Duration::from_secs(1));
        assert_eq!(config.initial_facing, CameraFacing::Back);
    }

    #[test]
    fn test_library_dir_name() {
        assert!(default_library_dir().ends_with(LIBRARY_DIR_NAME));
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        let config = Config {
            timer_tick_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.timer_tick(), Duration::from_millis(1));
    }
}
