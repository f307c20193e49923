// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! This module handles all application messages by routing them to focused handler methods.
//! The main `update()` function acts as a dispatcher, while specific handlers are implemented
//! in the `handlers` submodules organized by functional domain.
//!
//! # Handler Modules
//!
//! - `handlers::camera`: Binding, frames, camera state, torch and zoom
//! - `handlers::capture`: Shutter, capture results, capture flash
//! - `handlers::gestures`: Clicks, taps and tap-to-focus
//! - `handlers::gallery`: Photo grid overlay and thumbnails
//! - `handlers::ui`: Resize, toasts and back navigation

use crate::app::state::{AppModel, Message};
use crate::app::task::Task;
use tracing::{debug, info};

impl AppModel {
    /// Main message handler - routes messages to appropriate handler methods.
    pub fn update(&mut self, message: Message) -> Task {
        match message {
            // ===== Camera lifecycle =====
            Message::BindCamera => self.handle_bind_camera(),
            Message::CameraBound { generation, result } => {
                self.handle_camera_bound(generation, result)
            }
            Message::CameraReleased => {
                debug!("Replaced camera session released");
                Task::none()
            }
            Message::Frame(frame) => self.handle_frame(frame),
            Message::Camera(event) => self.handle_camera_event(event),
            Message::Resize { columns, rows } => self.handle_resize(columns, rows),

            // ===== Capture =====
            Message::Capture => self.handle_capture(),
            Message::CaptureFinished(result) => self.handle_capture_finished(result),
            Message::CaptureFlashShow => self.handle_capture_flash_show(),
            Message::CaptureFlashHide => self.handle_capture_flash_hide(),

            // ===== Controls =====
            Message::ToggleTorch => self.handle_toggle_torch(),
            Message::Pinch(scale) => self.handle_pinch(scale),
            Message::MouseDown { column, row } => self.handle_mouse_down(column, row),
            Message::MouseUp { column, row } => self.handle_mouse_up(column, row),
            Message::HideFocusIndicator(generation) => {
                self.handle_hide_focus_indicator(generation)
            }

            // ===== Gallery =====
            Message::ShowSessionPhotos => self.handle_show_session_photos(),
            Message::ShowAllPhotos => self.handle_show_all_photos(),
            Message::GalleryMove(direction) => self.handle_gallery_move(direction),
            Message::OpenSelectedPhoto => self.handle_open_selected_photo(),
            Message::ThumbnailLoaded { path, thumbnail } => {
                self.handle_thumbnail_loaded(path, thumbnail)
            }

            // ===== Misc =====
            Message::ShowToast { text, duration } => self.show_toast(text, duration),
            Message::HideToast(generation) => self.handle_hide_toast(generation),
            Message::Back => self.handle_back(),
            Message::Quit => {
                info!("Quit requested");
                Task::exit()
            }
        }
    }
}
