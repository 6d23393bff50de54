// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Interval between recording timer ticks
pub const RECORDING_TICK: Duration = Duration::from_secs(1);

/// Fixed name of the temporary recording file; deleted and recreated on
/// every recording start
pub const RECORDING_FILE_NAME: &str = "capture.mov";

/// Directory under the user's pictures folder that receives saved media
pub const LIBRARY_DIR_NAME: &str = "basic-camera";

/// File name prefixes for saved media
pub const PHOTO_PREFIX: &str = "IMG";
pub const VIDEO_PREFIX: &str = "VID";

/// Extension used for saved stills
pub const PHOTO_EXTENSION: &str = "jpg";

/// Timestamp layout used in saved file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
