// SPDX-License-Identifier: GPL-3.0-only

//! Screen-level handlers: resize, toasts, back navigation

use crate::app::aspect_ratio::{AspectRatio, aspect_ratio};
use crate::app::layout::ScreenLayout;
use crate::app::state::{AppModel, Message, Toast};
use crate::app::task::Task;
use ratatui::layout::Rect;
use std::time::Duration;
use tracing::{debug, info};

impl AppModel {
    /// Layout for the current terminal size
    pub fn layout(&self) -> ScreenLayout {
        ScreenLayout::new(Rect::new(0, 0, self.viewport.0, self.viewport.1))
    }

    /// Aspect ratio class of the preview region
    pub fn preview_aspect_ratio(&self) -> AspectRatio {
        let (width, height) = self.layout().preview_pixels();
        aspect_ratio(width, height)
    }

    pub(crate) fn handle_resize(&mut self, columns: u16, rows: u16) -> Task {
        if self.viewport == (columns, rows) {
            return Task::none();
        }
        self.viewport = (columns, rows);
        let gallery_task = self.request_visible_thumbnails();

        let target = self.preview_aspect_ratio();
        let rebind = match self.requested_aspect_ratio {
            Some(current) if current != target => {
                info!(from = %current, to = %target, "Preview aspect ratio changed");
                Task::done(Message::BindCamera)
            }
            _ => Task::none(),
        };
        Task::batch([gallery_task, rebind])
    }

    /// Show a toast, replacing any visible one
    pub(crate) fn show_toast(&mut self, text: impl Into<String>, duration: Duration) -> Task {
        self.toast_generation += 1;
        let toast = Toast {
            text: text.into(),
            generation: self.toast_generation,
        };
        debug!(text = %toast.text, "Showing toast");
        self.toast = Some(toast);
        Task::delay(duration, Message::HideToast(self.toast_generation))
    }

    pub(crate) fn handle_hide_toast(&mut self, generation: u64) -> Task {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.generation == generation)
        {
            self.toast = None;
        }
        Task::none()
    }

    pub(crate) fn handle_back(&mut self) -> Task {
        if self.gallery.take().is_some() {
            debug!("Gallery closed");
            return Task::none();
        }
        Task::done(Message::Quit)
    }
}
