// SPDX-License-Identifier: GPL-3.0-only

//! Mouse handlers: button clicks, gallery clicks and tap-to-focus

use crate::app::gestures::MeteringPointFactory;
use crate::app::layout::{self, Control};
use crate::app::state::{AppModel, FocusIndicator, Message};
use crate::app::task::Task;
use crate::backends::camera::types::{FocusMeteringAction, MeteringFlags};
use crate::constants::FOCUS_INDICATOR_DURATION;
use tracing::{debug, warn};

impl AppModel {
    pub(crate) fn handle_mouse_down(&mut self, column: u16, row: u16) -> Task {
        self.tap.press(column, row);
        Task::none()
    }

    pub(crate) fn handle_mouse_up(&mut self, column: u16, row: u16) -> Task {
        match self.tap.release(column, row) {
            Some((column, row)) => self.handle_tap(column, row),
            None => Task::none(),
        }
    }

    fn handle_tap(&mut self, column: u16, row: u16) -> Task {
        let screen = self.layout();

        if self.gallery.is_some() && layout::contains(screen.preview, column, row) {
            return self.handle_gallery_click(column, row);
        }

        if let Some(control) = screen.control_at(column, row, self.torch_visible()) {
            let message = match control {
                Control::Torch => Message::ToggleTorch,
                Control::SessionPhotos => Message::ShowSessionPhotos,
                Control::Shutter => Message::Capture,
                Control::AllPhotos => Message::ShowAllPhotos,
            };
            return Task::done(message);
        }

        if layout::contains(screen.preview, column, row) {
            return self.focus_at(column, row);
        }
        Task::none()
    }

    /// Focus and meter on the tapped point, then show the focus ring
    fn focus_at(&mut self, column: u16, row: u16) -> Task {
        let (Some(session), Some(frame)) = (self.session(), self.current_frame.as_ref()) else {
            return Task::none();
        };
        let image = layout::fit_image(self.layout().preview, frame.width, frame.height);
        let factory = MeteringPointFactory::new(image, frame.digital_zoom);
        let Some(point) = factory.create_point(column, row) else {
            debug!(column, row, "Tap outside the preview image");
            return Task::none();
        };

        let action = FocusMeteringAction::builder(point)
            .flags(MeteringFlags::AF)
            .auto_cancel_duration(self.config.focus_auto_cancel())
            .build();
        debug!(x = point.x, y = point.y, "Tap to focus");
        if let Err(e) = session.start_focus_and_metering(action) {
            warn!(error = %e, "Focus request failed");
        }

        self.focus_generation += 1;
        self.focus_indicator = Some(FocusIndicator {
            column,
            row,
            generation: self.focus_generation,
        });
        Task::delay(
            FOCUS_INDICATOR_DURATION,
            Message::HideFocusIndicator(self.focus_generation),
        )
    }

    /// Hide the focus ring unless a newer tap replaced it
    pub(crate) fn handle_hide_focus_indicator(&mut self, generation: u64) -> Task {
        if self
            .focus_indicator
            .is_some_and(|indicator| indicator.generation == generation)
        {
            self.focus_indicator = None;
        }
        Task::none()
    }
}
