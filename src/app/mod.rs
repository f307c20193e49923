// SPDX-License-Identifier: MPL-2.0

//! Camera screen: state, message handling and rendering
//!
//! # Architecture
//!
//! - `state`: Application state types (AppModel, Message, ShutterState, etc.)
//! - `task`: Follow-up work returned by `update`
//! - `update`: Message dispatch
//! - `handlers`: Message handlers grouped by concern
//! - `layout`: Screen geometry and hit-testing
//! - `gestures`: Tap and pinch recognition, metering points
//! - `gallery`: Photo grid overlay state
//! - `camera_preview`: Half-block image widgets
//! - `view`: Screen rendering
//!
//! Backend threads never touch the model. Frames and camera events are
//! drained from their channels by [`AppModel::poll_camera`]; capture results
//! arrive on the message queue; blocking work returns through
//! [`Task::perform`]. The model is only ever mutated on the UI thread.

pub mod aspect_ratio;
mod camera_preview;
pub mod gallery;
pub mod gestures;
mod handlers;
pub mod layout;
pub mod readiness;
mod state;
mod task;
mod update;
pub mod view;

pub use state::{
    AppModel, BoundCamera, CameraState, FocusIndicator, Message, MessageReceiver, MessageSender,
    ShutterState, Toast, message_channel,
};
pub use task::Task;

use crate::backends::camera::types::TorchState;
use crate::backends::camera::{CameraBackendManager, CameraSession};
use crate::config::Config;
use crate::constants::TOAST_LONG;
use crate::errors::CameraError;
use crate::pipelines::photo::CaptureExecutor;
use crate::storage::PhotoList;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

impl AppModel {
    pub fn new(
        config: Config,
        backend: CameraBackendManager,
        output_directory: PathBuf,
        executor: CaptureExecutor,
        messages: MessageSender,
    ) -> Self {
        Self {
            config,
            backend,
            output_directory,
            messages,
            executor,
            bind_lock: Arc::new(Mutex::new(())),
            bind_generation: 0,
            requested_aspect_ratio: None,
            permission_granted: false,
            camera: None,
            camera_status: None,
            frame_receiver: None,
            event_receiver: None,
            current_frame: None,
            last_result: Default::default(),
            torch_state: TorchState::Off,
            zoom_state: None,
            viewport: (0, 0),
            shutter_enabled: false,
            is_capturing: false,
            capture_flash: false,
            photos: PhotoList::new(),
            photo_count: 0,
            tap: Default::default(),
            focus_indicator: None,
            focus_generation: 0,
            toast: None,
            toast_generation: 0,
            gallery: None,
        }
    }

    /// Startup: check camera access, then bind for the given terminal size
    pub fn init(&mut self, columns: u16, rows: u16) -> Task {
        self.viewport = (columns, rows);
        info!(
            backend = %self.backend.backend_type(),
            output = %self.output_directory.display(),
            "Starting camera screen"
        );

        self.permission_granted = self.backend.has_permission();
        if !self.permission_granted {
            warn!("Camera permission denied; capture disabled");
            return self.show_toast(CameraError::PermissionDenied.to_string(), TOAST_LONG);
        }
        Task::done(Message::BindCamera)
    }

    /// Drain the camera channels into messages, oldest first
    pub fn poll_camera(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();

        // Both channels stay open while the session lives; a closed channel
        // simply yields nothing until the next bind replaces it.
        if let Some(receiver) = self.event_receiver.as_mut() {
            while let Ok(event) = receiver.try_recv() {
                messages.push(Message::Camera(event));
            }
        }
        if let Some(receiver) = self.frame_receiver.as_mut() {
            while let Ok(frame) = receiver.try_recv() {
                messages.push(Message::Frame(frame));
            }
        }

        messages
    }

    /// Finish pending captures, turn the torch off and release the camera
    pub fn shutdown(&mut self) {
        self.executor.shutdown();

        if let Some(camera) = self.camera.take() {
            if self.torch_state == TorchState::On
                && let Err(e) = camera.session.enable_torch(false)
            {
                warn!(error = %e, "Failed to turn torch off");
            }
            camera.session.unbind();
        }
        self.frame_receiver = None;
        self.event_receiver = None;
        info!(photos = self.photos.len(), "Camera screen closed");
    }

    pub(crate) fn session(&self) -> Option<&Arc<dyn CameraSession>> {
        self.camera.as_ref().map(|camera| &camera.session)
    }
}
