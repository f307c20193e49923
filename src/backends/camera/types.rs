// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::{RATIO_4_3_VALUE, RATIO_16_9_VALUE};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Camera backend type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
pub enum CameraBackendType {
    /// Video4Linux2 devices under /dev/video*
    #[default]
    V4l2,
    /// Synthetic test pattern with simulated 3A convergence
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

/// Which way the lens points relative to the device
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
pub enum LensFacing {
    #[default]
    Back,
    Front,
    External,
}

impl std::fmt::Display for LensFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensFacing::Back => write!(f, "back"),
            LensFacing::Front => write!(f, "front"),
            LensFacing::External => write!(f, "external"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDevice {
    pub name: String,
    /// Capture device path (e.g. /dev/video0) or a synthetic identifier
    pub path: String,
    /// V4L2 driver name, when known
    pub driver: Option<String>,
    /// Physical placement; None when the device does not report it (most webcams)
    pub facing: Option<LensFacing>,
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    pub fn as_int(&self) -> u32 {
        self.num / self.denom
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

/// Stream aspect ratios a camera can be bound with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Ratio4_3,
    Ratio16_9,
}

impl AspectRatio {
    /// Long side divided by short side
    pub fn value(&self) -> f64 {
        match self {
            AspectRatio::Ratio4_3 => RATIO_4_3_VALUE,
            AspectRatio::Ratio16_9 => RATIO_16_9_VALUE,
        }
    }

    /// Whichever of 4:3 and 16:9 is closest to `width` x `height`.
    ///
    /// Orientation doesn't matter: the ratio is always long side over short side.
    /// An exact tie resolves to 4:3.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        let (long, short) = (width.max(height), width.min(height));
        if short == 0 {
            return AspectRatio::Ratio4_3;
        }
        let ratio = long as f64 / short as f64;
        if (ratio - RATIO_4_3_VALUE).abs() <= (ratio - RATIO_16_9_VALUE).abs() {
            return AspectRatio::Ratio4_3;
        }
        AspectRatio::Ratio16_9
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AspectRatio::Ratio4_3 => write!(f, "4:3"),
            AspectRatio::Ratio16_9 => write!(f, "16:9"),
        }
    }
}

/// Camera format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    /// FourCC code (e.g., "MJPG", "YUYV")
    pub pixel_format: String,
}

impl CameraFormat {
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::from_dimensions(self.width, self.height)
    }
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = &self.framerate {
            write!(
                f,
                "{}x{} @ {}fps {}",
                self.width, self.height, fps, self.pixel_format
            )
        } else {
            write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
        }
    }
}

/// Pixel layout of a [`CameraFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Map a V4L2 FourCC to a frame layout the preview can sample directly.
    ///
    /// MJPG is absent on purpose: compressed frames are decoded to RGB24 by the
    /// capture thread before they become `CameraFrame`s.
    pub fn from_fourcc(fourcc: &str) -> Option<Self> {
        match fourcc {
            "YUYV" => Some(Self::YUYV),
            "UYVY" => Some(Self::UYVY),
            "GREY" => Some(Self::Gray8),
            "RGB3" => Some(Self::RGB24),
            "AB24" | "RGBA" => Some(Self::RGBA),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA => 4,
            Self::RGB24 => 3,
            Self::YUYV | Self::UYVY => 2,
            Self::Gray8 => 1,
        }
    }
}

/// Autofocus state reported per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfState {
    Inactive,
    /// Continuous AF is moving the lens
    PassiveScan,
    /// Continuous AF believes the scene is in focus
    PassiveFocused,
    /// Triggered (one-shot) scan in progress
    ActiveScan,
    /// Triggered scan finished in focus; lens locked
    FocusedLocked,
    /// Triggered scan failed; lens locked
    NotFocusedLocked,
    /// Continuous AF believes the scene is out of focus
    PassiveUnfocused,
}

/// Auto exposure state reported per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeState {
    Inactive,
    Searching,
    Converged,
    Locked,
}

/// Auto white balance state reported per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwbState {
    Inactive,
    Searching,
    Converged,
    Locked,
}

/// Lens motion reported per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensState {
    Stationary,
    Moving,
}

/// Per-frame 3A snapshot. Any field may be missing when the camera does not
/// report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureResult {
    pub af_state: Option<AfState>,
    pub ae_state: Option<AeState>,
    pub awb_state: Option<AwbState>,
    pub lens_state: Option<LensState>,
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Frame sequence number within the session
    pub sequence: u64,
    pub captured_at: Instant,
    /// Center crop factor still to be applied (1.0 when zoom happens in hardware)
    pub digital_zoom: f32,
    /// 3A state the frame was produced under
    pub result: CaptureResult,
}

/// Torch (continuous flash) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TorchState {
    #[default]
    Off,
    On,
}

/// Zoom ratio and the range the camera supports
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub zoom_ratio: f32,
    pub min_zoom_ratio: f32,
    pub max_zoom_ratio: f32,
}

impl ZoomState {
    pub fn clamp(&self, ratio: f32) -> f32 {
        ratio.clamp(self.min_zoom_ratio, self.max_zoom_ratio)
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            zoom_ratio: 1.0,
            min_zoom_ratio: 1.0,
            max_zoom_ratio: 1.0,
        }
    }
}

/// Normalized sensor coordinate used to target focus and metering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteringPoint {
    /// 0.0 = left edge, 1.0 = right edge
    pub x: f32,
    /// 0.0 = top edge, 1.0 = bottom edge
    pub y: f32,
    /// Region size as a fraction of the frame
    pub size: f32,
}

/// Which 3A routines a focus/metering action drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeteringFlags {
    pub af: bool,
    pub ae: bool,
    pub awb: bool,
}

impl MeteringFlags {
    pub const AF: MeteringFlags = MeteringFlags {
        af: true,
        ae: false,
        awb: false,
    };
    pub const ALL: MeteringFlags = MeteringFlags {
        af: true,
        ae: true,
        awb: true,
    };
}

/// A focus/metering request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusMeteringAction {
    pub point: MeteringPoint,
    pub flags: MeteringFlags,
    /// None keeps the lock until the next request
    pub auto_cancel: Option<Duration>,
}

impl FocusMeteringAction {
    pub fn builder(point: MeteringPoint) -> FocusMeteringActionBuilder {
        FocusMeteringActionBuilder {
            action: FocusMeteringAction {
                point,
                flags: MeteringFlags::ALL,
                auto_cancel: Some(crate::constants::DEFAULT_FOCUS_AUTO_CANCEL),
            },
        }
    }
}

pub struct FocusMeteringActionBuilder {
    action: FocusMeteringAction,
}

impl FocusMeteringActionBuilder {
    pub fn flags(mut self, flags: MeteringFlags) -> Self {
        self.action.flags = flags;
        self
    }

    pub fn auto_cancel_duration(mut self, duration: Duration) -> Self {
        self.action.auto_cancel = Some(duration);
        self
    }

    pub fn disable_auto_cancel(mut self) -> Self {
        self.action.auto_cancel = None;
        self
    }

    pub fn build(self) -> FocusMeteringAction {
        self.action
    }
}

/// Errors a bound camera can report through its state observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraStateError {
    StreamConfig,
    CameraInUse,
    MaxCamerasInUse,
    OtherRecoverable,
    CameraDisabled,
    Fatal,
    DoNotDisturbModeEnabled,
}

impl CameraStateError {
    pub const ALL: [CameraStateError; 7] = [
        CameraStateError::StreamConfig,
        CameraStateError::CameraInUse,
        CameraStateError::MaxCamerasInUse,
        CameraStateError::OtherRecoverable,
        CameraStateError::CameraDisabled,
        CameraStateError::Fatal,
        CameraStateError::DoNotDisturbModeEnabled,
    ];

    /// Text shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            CameraStateError::StreamConfig => "Stream config error",
            CameraStateError::CameraInUse => "Camera in use",
            CameraStateError::MaxCamerasInUse => "Max cameras in use",
            CameraStateError::OtherRecoverable => "Other recoverable error",
            CameraStateError::CameraDisabled => "Camera disabled",
            CameraStateError::Fatal => "Fatal error",
            CameraStateError::DoNotDisturbModeEnabled => "Do not disturb mode enabled",
        }
    }

    /// Classify an OS error raised while opening or streaming a device
    pub fn from_errno(errno: i32) -> Self {
        match errno {
            libc::EBUSY => CameraStateError::CameraInUse,
            libc::ENOSPC => CameraStateError::MaxCamerasInUse,
            libc::EACCES | libc::EPERM => CameraStateError::CameraDisabled,
            libc::EINVAL => CameraStateError::StreamConfig,
            libc::ENODEV | libc::ENXIO | libc::EIO => CameraStateError::Fatal,
            _ => CameraStateError::OtherRecoverable,
        }
    }

    pub fn from_io_error(error: &std::io::Error) -> Self {
        error
            .raw_os_error()
            .map(Self::from_errno)
            .unwrap_or(CameraStateError::OtherRecoverable)
    }
}

impl std::fmt::Display for CameraStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Lifecycle status of a bound camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraStatus {
    PendingOpen,
    Opening,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraState {
    pub status: CameraStatus,
    pub error: Option<CameraStateError>,
}

impl CameraState {
    pub fn new(status: CameraStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn with_error(status: CameraStatus, error: CameraStateError) -> Self {
        Self {
            status,
            error: Some(error),
        }
    }
}

/// Notifications a session sends besides frames
#[derive(Debug, Clone)]
pub enum CameraEvent {
    State(CameraState),
    Torch(TorchState),
    Zoom(ZoomState),
}

/// Streams a camera can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCase {
    Preview,
    ImageCapture,
}

/// Autofocus mode requested at bind time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfMode {
    /// Continuous autofocus tuned for stills
    #[default]
    ContinuousPicture,
    Off,
}

/// Everything a backend needs to open and configure a camera
#[derive(Debug, Clone, PartialEq)]
pub struct BindRequest {
    pub lens_facing: LensFacing,
    /// Preferred device path; overrides lens facing when present
    pub device_path: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub use_cases: Vec<UseCase>,
    /// Upper bound on the stream size, in pixels
    pub max_pixels: u64,
    pub af_mode: AfMode,
}

impl BindRequest {
    pub fn wants(&self, use_case: UseCase) -> bool {
        self.use_cases.contains(&use_case)
    }
}

/// Static facts and current control values of a bound camera
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub device: CameraDevice,
    pub format: CameraFormat,
    pub has_flash_unit: bool,
    pub torch_state: TorchState,
    pub zoom_state: ZoomState,
}

/// Latest frame of a bound camera, readable by the capture executor.
#[derive(Debug, Clone, Default)]
pub struct StillSource {
    latest: Arc<Mutex<Option<CameraFrame>>>,
}

impl StillSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: CameraFrame) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(frame);
        }
    }

    pub fn latest(&self) -> Option<CameraFrame> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }
}

/// Frame receiver type for preview streams
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Frame sender type for preview streams
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;

/// Event receiver type for state/torch/zoom notifications
pub type EventReceiver = futures::channel::mpsc::UnboundedReceiver<CameraEvent>;

/// Event sender type for state/torch/zoom notifications
pub type EventSender = futures::channel::mpsc::UnboundedSender<CameraEvent>;

/// Sending halves handed to a backend when binding
#[derive(Clone)]
pub struct SessionChannels {
    pub frames: FrameSender,
    pub events: EventSender,
}

impl SessionChannels {
    /// Create the channel pair; frames are bounded so a slow UI drops frames
    /// instead of queueing them.
    pub fn new(frame_capacity: usize) -> (Self, FrameReceiver, EventReceiver) {
        let (frames, frame_rx) = futures::channel::mpsc::channel(frame_capacity);
        let (events, event_rx) = futures::channel::mpsc::unbounded();
        (Self { frames, events }, frame_rx, event_rx)
    }

    pub fn send_event(&self, event: CameraEvent) {
        // Receiver gone means the screen is shutting down
        let _ = self.events.unbounded_send(event);
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// No camera matched the request
    DeviceNotFound(String),
    /// Camera could not be opened or configured
    InitializationFailed(String),
    /// No usable format for the request
    FormatNotSupported(String),
    /// Camera has no such control (torch, zoom, focus)
    Unsupported(&'static str),
    /// Requested value outside the supported range
    OutOfRange(String),
    /// Session was already unbound
    NotBound,
    /// Device reported a state error
    Camera(CameraStateError),
    /// General I/O error
    IoError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Unsupported(what) => write!(f, "Camera does not support {}", what),
            BackendError::OutOfRange(msg) => write!(f, "Value out of range: {}", msg),
            BackendError::NotBound => write!(f, "Camera session is not bound"),
            BackendError::Camera(err) => write!(f, "Camera error: {}", err),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_aspect_ratio() {
        let format = |width, height| CameraFormat {
            width,
            height,
            framerate: None,
            pixel_format: "YUYV".to_string(),
        };
        assert_eq!(format(1920, 1080).aspect_ratio(), AspectRatio::Ratio16_9);
        assert_eq!(format(640, 480).aspect_ratio(), AspectRatio::Ratio4_3);
        assert_eq!(format(480, 640).aspect_ratio(), AspectRatio::Ratio4_3);
        assert_eq!(format(0, 0).aspect_ratio(), AspectRatio::Ratio4_3);
        assert_eq!(AspectRatio::Ratio16_9.to_string(), "16:9");
    }

    #[test]
    fn test_camera_state_error_messages() {
        assert_eq!(
            CameraStateError::StreamConfig.message(),
            "Stream config error"
        );
        assert_eq!(CameraStateError::CameraInUse.message(), "Camera in use");
        assert_eq!(
            CameraStateError::MaxCamerasInUse.message(),
            "Max cameras in use"
        );
        assert_eq!(
            CameraStateError::OtherRecoverable.message(),
            "Other recoverable error"
        );
        assert_eq!(CameraStateError::CameraDisabled.message(), "Camera disabled");
        assert_eq!(CameraStateError::Fatal.message(), "Fatal error");
        assert_eq!(
            CameraStateError::DoNotDisturbModeEnabled.message(),
            "Do not disturb mode enabled"
        );
    }

    #[test]
    fn test_errno_classification() {
        assert_eq!(
            CameraStateError::from_errno(libc::EBUSY),
            CameraStateError::CameraInUse
        );
        assert_eq!(
            CameraStateError::from_errno(libc::ENOSPC),
            CameraStateError::MaxCamerasInUse
        );
        assert_eq!(
            CameraStateError::from_errno(libc::EACCES),
            CameraStateError::CameraDisabled
        );
        assert_eq!(
            CameraStateError::from_errno(libc::ENODEV),
            CameraStateError::Fatal
        );
        assert_eq!(
            CameraStateError::from_errno(libc::EAGAIN),
            CameraStateError::OtherRecoverable
        );
    }

    #[test]
    fn test_focus_action_builder() {
        let point = MeteringPoint {
            x: 0.25,
            y: 0.75,
            size: 0.15,
        };
        let action = FocusMeteringAction::builder(point)
            .flags(MeteringFlags::AF)
            .auto_cancel_duration(Duration::from_secs(3))
            .build();
        assert_eq!(action.flags, MeteringFlags::AF);
        assert_eq!(action.auto_cancel, Some(Duration::from_secs(3)));

        let locked = FocusMeteringAction::builder(point)
            .disable_auto_cancel()
            .build();
        assert_eq!(locked.auto_cancel, None);
        assert_eq!(locked.flags, MeteringFlags::ALL);
    }

    #[test]
    fn test_lens_facing_from_location() {
        assert_eq!(LensFacing::from_location("back"), Some(LensFacing::Back));
        assert_eq!(LensFacing::from_location(" Front\n"), Some(LensFacing::Front));
        assert_eq!(LensFacing::from_location("ceiling"), None);
    }

    #[test]
    fn test_zoom_clamp() {
        let zoom = ZoomState {
            zoom_ratio: 2.0,
            min_zoom_ratio: 1.0,
            max_zoom_ratio: 4.0,
        };
        assert_eq!(zoom.clamp(0.5), 1.0);
        assert_eq!(zoom.clamp(3.0), 3.0);
        assert_eq!(zoom.clamp(9.0), 4.0);
    }

    #[test]
    fn test_still_source_keeps_latest() {
        let source = StillSource::new();
        assert!(source.latest().is_none());
        for sequence in 0..3 {
            source.publish(CameraFrame {
                width: 2,
                height: 2,
                data: Arc::from(vec![0u8; 12]),
                format: PixelFormat::RGB24,
                stride: 6,
                sequence,
                captured_at: Instant::now(),
                digital_zoom: 1.0,
                result: CaptureResult::default(),
            });
        }
        assert_eq!(source.latest().map(|f| f.sequence), Some(2));
        source.clear();
        assert!(source.latest().is_none());
    }
}
