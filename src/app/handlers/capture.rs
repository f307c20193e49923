// SPDX-License-Identifier: GPL-3.0-only

//! Capture operations handlers
//!
//! Handles the shutter, the capture result and the capture flash.

use crate::app::state::{AppModel, Message};
use crate::app::task::Task;
use crate::constants::{ANIMATION_FAST_MILLIS, ANIMATION_SLOW_MILLIS, FILENAME_FORMAT, PHOTO_EXTENSION};
use crate::pipelines::photo::{ImageCaptureError, OutputFileOptions, OutputFileResults};
use crate::storage;
use std::time::Duration;
use tracing::{debug, error, info};

impl AppModel {
    // =========================================================================
    // Capture Operations Handlers
    // =========================================================================

    /// Capture the latest frame into a new timestamped file
    pub(crate) fn handle_capture(&mut self) -> Task {
        let Some(image_capture) = self
            .camera
            .as_ref()
            .and_then(|camera| camera.image_capture.clone())
        else {
            debug!("No image capture use case bound");
            return Task::none();
        };
        if self.is_capturing {
            debug!("Capture already in progress");
            return Task::none();
        }
        if !self.shutter_enabled {
            debug!(result = ?self.last_result, "Shutter disabled until the camera settles");
            return Task::none();
        }

        self.is_capturing = true;
        let file = storage::create_file(&self.output_directory, FILENAME_FORMAT, PHOTO_EXTENSION);
        info!(path = %file.display(), "Capturing photo...");

        let messages = self.messages.clone();
        image_capture.take_picture(OutputFileOptions::new(file), move |result| {
            // Queue closed means the screen is gone; the file is already written
            let _ = messages.unbounded_send(Message::CaptureFinished(result));
        });

        Task::delay(
            Duration::from_millis(ANIMATION_SLOW_MILLIS),
            Message::CaptureFlashShow,
        )
    }

    pub(crate) fn handle_capture_finished(
        &mut self,
        result: Result<OutputFileResults, ImageCaptureError>,
    ) -> Task {
        self.is_capturing = false;
        match result {
            Ok(output) => {
                info!(path = %output.saved_uri.display(), "Photo capture succeeded");
                self.photo_count = self.photos.push(output.saved_uri);
            }
            Err(e) => {
                error!(error = %e, "Photo capture failed");
            }
        }
        Task::none()
    }

    pub(crate) fn handle_capture_flash_show(&mut self) -> Task {
        self.capture_flash = true;
        Task::delay(
            Duration::from_millis(ANIMATION_FAST_MILLIS),
            Message::CaptureFlashHide,
        )
    }

    pub(crate) fn handle_capture_flash_hide(&mut self) -> Task {
        self.capture_flash = false;
        Task::none()
    }
}
