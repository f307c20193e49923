// SPDX-License-Identifier: GPL-3.0-only

//! Application state management

use crate::app::aspect_ratio::AspectRatio;
use crate::app::gallery::{GalleryDirection, GalleryState};
use crate::app::gestures::TapTracker;
use crate::backends::camera::types::{
    BackendError, CameraEvent, CameraFrame, CameraInfo, CameraStatus, CaptureResult,
    EventReceiver, FrameReceiver, TorchState, ZoomState,
};
use crate::backends::camera::{CameraBackendManager, CameraSession};
use crate::config::Config;
use crate::pipelines::photo::{CaptureExecutor, ImageCapture, ImageCaptureError, OutputFileResults};
use crate::storage::{PhotoList, Thumbnail};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sending half of the UI message queue
pub type MessageSender = futures::channel::mpsc::UnboundedSender<Message>;

/// Receiving half of the UI message queue
pub type MessageReceiver = futures::channel::mpsc::UnboundedReceiver<Message>;

/// Create the UI message queue
pub fn message_channel() -> (MessageSender, MessageReceiver) {
    futures::channel::mpsc::unbounded()
}

/// A bound camera session travelling inside a message
#[derive(Clone)]
pub struct BoundCamera(pub Arc<dyn CameraSession>);

impl std::fmt::Debug for BoundCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoundCamera")
            .field(&self.0.camera_info().device.name)
            .finish()
    }
}

/// All user interactions and system events
#[derive(Debug)]
pub enum Message {
    // ===== Camera lifecycle =====
    /// Bind (or rebind) the camera use cases
    BindCamera,
    /// A bind finished; stale generations are discarded
    CameraBound {
        generation: u64,
        result: Result<BoundCamera, BackendError>,
    },
    /// A replaced session finished unbinding
    CameraReleased,
    /// New preview frame
    Frame(CameraFrame),
    /// State, torch or zoom notification
    Camera(CameraEvent),
    /// Terminal resized
    Resize { columns: u16, rows: u16 },

    // ===== Capture =====
    Capture,
    CaptureFinished(Result<OutputFileResults, ImageCaptureError>),
    CaptureFlashShow,
    CaptureFlashHide,

    // ===== Controls =====
    ToggleTorch,
    /// Scale the zoom ratio by a pinch factor
    Pinch(f32),
    MouseDown { column: u16, row: u16 },
    MouseUp { column: u16, row: u16 },
    HideFocusIndicator(u64),

    // ===== Gallery =====
    ShowSessionPhotos,
    ShowAllPhotos,
    GalleryMove(GalleryDirection),
    OpenSelectedPhoto,
    ThumbnailLoaded {
        path: PathBuf,
        thumbnail: Option<Thumbnail>,
    },

    // ===== Misc =====
    ShowToast { text: String, duration: Duration },
    HideToast(u64),
    /// Close the overlay, or quit when none is open
    Back,
    Quit,
}

/// What the shutter button currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterState {
    Ready,
    /// Waiting for focus and white balance
    Waiting,
    /// A capture is being saved
    Busy,
    /// No image capture use case
    Unavailable,
}

/// Transient notice above the bottom bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    pub generation: u64,
}

/// Focus ring drawn where the user tapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusIndicator {
    pub column: u16,
    pub row: u16,
    pub generation: u64,
}

/// Everything bound to the current camera
pub struct CameraState {
    pub session: Arc<dyn CameraSession>,
    pub info: CameraInfo,
    pub image_capture: Option<ImageCapture>,
}

/// The main application model
pub struct AppModel {
    /// Configuration data that persists between application runs
    pub config: Config,
    /// Shared camera backend handle
    pub backend: CameraBackendManager,
    /// Directory photos are written to
    pub output_directory: PathBuf,
    /// Queue for results produced outside the UI thread
    pub messages: MessageSender,
    /// Runs captures one at a time
    pub executor: CaptureExecutor,
    /// Serializes unbind/bind pairs running on worker threads
    pub bind_lock: Arc<Mutex<()>>,
    pub bind_generation: u64,
    /// Aspect ratio of the latest bind request
    pub requested_aspect_ratio: Option<AspectRatio>,

    pub permission_granted: bool,
    pub camera: Option<CameraState>,
    pub camera_status: Option<CameraStatus>,
    pub frame_receiver: Option<FrameReceiver>,
    pub event_receiver: Option<EventReceiver>,
    pub current_frame: Option<CameraFrame>,
    pub last_result: CaptureResult,
    pub torch_state: TorchState,
    pub zoom_state: Option<ZoomState>,

    /// Terminal size in cells
    pub viewport: (u16, u16),
    /// Readiness gate output for the latest frame
    pub shutter_enabled: bool,
    pub is_capturing: bool,
    pub capture_flash: bool,
    pub photos: PhotoList,
    /// Displayed photo count
    pub photo_count: usize,

    pub tap: TapTracker,
    pub focus_indicator: Option<FocusIndicator>,
    pub focus_generation: u64,
    pub toast: Option<Toast>,
    pub toast_generation: u64,
    pub gallery: Option<GalleryState>,
}

impl AppModel {
    pub fn shutter_state(&self) -> ShutterState {
        let has_capture = self
            .camera
            .as_ref()
            .is_some_and(|camera| camera.image_capture.is_some());
        if !has_capture {
            ShutterState::Unavailable
        } else if self.is_capturing {
            ShutterState::Busy
        } else if self.shutter_enabled {
            ShutterState::Ready
        } else {
            ShutterState::Waiting
        }
    }

    /// Torch button is shown only for cameras with a flash unit
    pub fn torch_visible(&self) -> bool {
        self.camera
            .as_ref()
            .is_some_and(|camera| camera.info.has_flash_unit)
    }
}
