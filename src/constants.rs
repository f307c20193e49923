// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Directory name used under the pictures directory
pub const APP_NAME: &str = "Viewfinder";

/// chrono pattern for photo names, `yyyy-MM-dd-HH-mm-ss-SSS`
pub const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Extension (with dot) of captured photos
pub const PHOTO_EXTENSION: &str = ".jpg";

/// 4:3 reference ratio
pub const RATIO_4_3_VALUE: f64 = 4.0 / 3.0;

/// 16:9 reference ratio
pub const RATIO_16_9_VALUE: f64 = 16.0 / 9.0;

/// Tap-to-focus locks AF for this long before continuous AF resumes
pub const FOCUS_AUTO_CANCEL: Duration = Duration::from_secs(3);

/// Auto-cancel used by focus actions that don't specify one
pub const DEFAULT_FOCUS_AUTO_CANCEL: Duration = Duration::from_secs(5);

/// How long the focus ring stays on screen after a tap
pub const FOCUS_INDICATOR_DURATION: Duration = Duration::from_millis(3000);

/// Metering region edge, as a fraction of the frame
pub const METERING_POINT_SIZE: f32 = 0.15;

/// Scale factor applied per scroll notch / zoom key press
pub const PINCH_SCALE_STEP: f32 = 1.1;

/// Delay before the capture flash appears
pub const ANIMATION_SLOW_MILLIS: u64 = 100;

/// How long the capture flash stays on screen
pub const ANIMATION_FAST_MILLIS: u64 = 50;

/// Toast durations
pub const TOAST_SHORT: Duration = Duration::from_millis(2000);
pub const TOAST_LONG: Duration = Duration::from_millis(3500);

/// UI loop input poll timeout (~60 Hz)
pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Frames buffered between a capture thread and the UI before dropping
pub const FRAME_CHANNEL_CAPACITY: usize = 4;

/// Default upper bound for the bound stream size
pub const DEFAULT_MAX_CAPTURE_PIXELS: u64 = 1920 * 1080;

/// Digital zoom range used when the camera has no optical/hardware zoom
pub const MAX_DIGITAL_ZOOM: f32 = 4.0;

/// The CLI `photo` command waits this long for the readiness gate
pub const CLI_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Gallery grid cell size in terminal cells (thumbnail + caption row)
pub const GALLERY_CELL_WIDTH: u16 = 24;
pub const GALLERY_CELL_HEIGHT: u16 = 10;

/// Application version string
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}
