// SPDX-License-Identifier: GPL-3.0-only

//! Camera control handlers
//!
//! Handles binding, frames, camera state events, torch and zoom.

use crate::app::gestures::pinch_zoom_ratio;
use crate::app::readiness::capture_ready;
use crate::app::state::{AppModel, BoundCamera, CameraState, Message};
use crate::app::task::Task;
use crate::backends::camera::types::{
    AfMode, BackendError, BindRequest, CameraEvent, CameraFrame, CameraStatus, SessionChannels,
    TorchState, UseCase,
};
use crate::constants::{FRAME_CHANNEL_CAPACITY, TOAST_SHORT};
use crate::errors::CameraError;
use crate::pipelines::photo::ImageCapture;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

impl AppModel {
    // =========================================================================
    // Camera Control Handlers
    // =========================================================================

    /// Unbind the current camera (if any) and bind the preview and capture
    /// use cases with the aspect ratio of the current preview region.
    pub(crate) fn handle_bind_camera(&mut self) -> Task {
        if !self.permission_granted {
            debug!("Not binding: camera permission denied");
            return Task::none();
        }

        self.bind_generation += 1;
        let generation = self.bind_generation;
        let aspect_ratio = self.preview_aspect_ratio();
        let request = BindRequest {
            lens_facing: self.config.lens_facing,
            device_path: None,
            aspect_ratio,
            use_cases: vec![UseCase::Preview, UseCase::ImageCapture],
            max_pixels: self.config.max_capture_pixels,
            af_mode: AfMode::ContinuousPicture,
        };
        info!(generation, aspect = %aspect_ratio, "Binding camera");
        self.requested_aspect_ratio = Some(aspect_ratio);

        let previous = self.camera.take().map(|camera| camera.session);
        self.current_frame = None;
        self.shutter_enabled = false;
        self.camera_status = None;
        self.torch_state = TorchState::Off;
        self.zoom_state = None;

        let (channels, frame_receiver, event_receiver) =
            SessionChannels::new(FRAME_CHANNEL_CAPACITY);
        self.frame_receiver = Some(frame_receiver);
        self.event_receiver = Some(event_receiver);

        let backend = self.backend.clone();
        let bind_lock = Arc::clone(&self.bind_lock);
        Task::perform(move || {
            let _guard = bind_lock.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = previous {
                previous.unbind();
            }
            let result = backend
                .bind(&request, channels)
                .map(|session| BoundCamera(Arc::from(session)));
            Message::CameraBound { generation, result }
        })
    }

    pub(crate) fn handle_camera_bound(
        &mut self,
        generation: u64,
        result: Result<BoundCamera, BackendError>,
    ) -> Task {
        if generation != self.bind_generation {
            debug!(generation, current = self.bind_generation, "Discarding stale bind");
            return match result {
                Ok(BoundCamera(session)) => Task::perform(move || {
                    session.unbind();
                    Message::CameraReleased
                }),
                Err(_) => Task::none(),
            };
        }

        match result {
            Ok(BoundCamera(session)) => {
                let info = session.camera_info();
                let image_capture = Some(ImageCapture::new(
                    session.still_source(),
                    self.executor.clone(),
                    self.config.photo_quality,
                ));
                self.torch_state = info.torch_state;
                self.zoom_state = Some(info.zoom_state);
                self.camera = Some(CameraState {
                    session,
                    info,
                    image_capture,
                });
                Task::none()
            }
            Err(e) => {
                error!(error = %e, "Use case binding failed");
                self.frame_receiver = None;
                self.event_receiver = None;
                let message = CameraError::from(e).to_string();
                self.show_toast(message, TOAST_SHORT)
            }
        }
    }

    /// Store the frame and gate the shutter on its 3A state
    pub(crate) fn handle_frame(&mut self, frame: CameraFrame) -> Task {
        if self.camera.is_none() {
            return Task::none();
        }
        let ready = capture_ready(&frame.result);
        if ready != self.shutter_enabled {
            debug!(
                ready,
                af = ?frame.result.af_state,
                ae = ?frame.result.ae_state,
                awb = ?frame.result.awb_state,
                lens = ?frame.result.lens_state,
                "Capture readiness changed"
            );
        } else {
            trace!(sequence = frame.sequence, ae = ?frame.result.ae_state, "Frame");
        }
        self.shutter_enabled = ready;
        self.last_result = frame.result;
        self.current_frame = Some(frame);
        Task::none()
    }

    pub(crate) fn handle_camera_event(&mut self, event: CameraEvent) -> Task {
        match event {
            CameraEvent::State(state) => {
                debug!(status = ?state.status, error = ?state.error, "Camera state");
                self.camera_status = Some(state.status);
                if state.status == CameraStatus::Closed {
                    self.shutter_enabled = false;
                }
                if let Some(err) = state.error {
                    warn!(error = %err, "Camera state error");
                    return self.show_toast(err.message(), TOAST_SHORT);
                }
                Task::none()
            }
            CameraEvent::Torch(torch) => {
                debug!(torch = ?torch, "Torch state changed");
                self.torch_state = torch;
                if let Some(camera) = self.camera.as_mut() {
                    camera.info.torch_state = torch;
                }
                Task::none()
            }
            CameraEvent::Zoom(zoom) => {
                debug!(ratio = zoom.zoom_ratio, "Zoom changed");
                self.zoom_state = Some(zoom);
                if let Some(camera) = self.camera.as_mut() {
                    camera.info.zoom_state = zoom;
                }
                Task::none()
            }
        }
    }

    /// Turn the torch on iff it is currently off
    pub(crate) fn handle_toggle_torch(&mut self) -> Task {
        if !self.torch_visible() {
            debug!("No flash unit; ignoring torch toggle");
            return Task::none();
        }
        let Some(session) = self.session() else {
            return Task::none();
        };
        let enable = self.torch_state == TorchState::Off;
        if let Err(e) = session.enable_torch(enable) {
            warn!(error = %e, enable, "Torch request failed");
        }
        Task::none()
    }

    pub(crate) fn handle_pinch(&mut self, scale: f32) -> Task {
        let Some(session) = self.session() else {
            return Task::none();
        };
        let ratio = pinch_zoom_ratio(self.zoom_state.as_ref(), scale);
        debug!(scale, ratio, "Pinch zoom");
        if let Err(e) = session.set_zoom_ratio(ratio) {
            warn!(error = %e, ratio, "Zoom request failed");
        }
        Task::none()
    }
}
