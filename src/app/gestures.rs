// SPDX-License-Identifier: GPL-3.0-only

//! Tap and pinch recognition on the preview

use crate::backends::camera::types::{MeteringPoint, ZoomState};
use crate::constants::METERING_POINT_SIZE;
use ratatui::layout::Rect;

/// Maps preview cells to normalized sensor coordinates.
///
/// The preview shows a letterboxed, possibly digitally zoomed, view of the
/// frame; the factory undoes both so the point lands where the user tapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteringPointFactory {
    image: Rect,
    /// Visible fraction of the sensor along each axis
    visible: f32,
}

impl MeteringPointFactory {
    pub fn new(image: Rect, digital_zoom: f32) -> Self {
        Self {
            image,
            visible: 1.0 / digital_zoom.max(1.0),
        }
    }

    /// Point under a cell; `None` outside the displayed image
    pub fn create_point(&self, column: u16, row: u16) -> Option<MeteringPoint> {
        if self.image.width == 0
            || self.image.height == 0
            || !super::layout::contains(self.image, column, row)
        {
            return None;
        }
        let offset = (1.0 - self.visible) / 2.0;
        let view_x = (column - self.image.x) as f32 + 0.5;
        let view_y = (row - self.image.y) as f32 + 0.5;
        Some(MeteringPoint {
            x: offset + self.visible * view_x / self.image.width as f32,
            y: offset + self.visible * view_y / self.image.height as f32,
            size: METERING_POINT_SIZE,
        })
    }
}

/// Press/release pair recognized as a tap when both land within one cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapTracker {
    down: Option<(u16, u16)>,
}

impl TapTracker {
    pub fn press(&mut self, column: u16, row: u16) {
        self.down = Some((column, row));
    }

    /// Returns the press position if the release completes a tap
    pub fn release(&mut self, column: u16, row: u16) -> Option<(u16, u16)> {
        let (down_column, down_row) = self.down.take()?;
        if down_column.abs_diff(column) <= 1 && down_row.abs_diff(row) <= 1 {
            Some((down_column, down_row))
        } else {
            None
        }
    }
}

/// Zoom ratio after a pinch of `scale`, starting from the current ratio
/// (1.0 when unknown) and clamped to the camera's range.
pub fn pinch_zoom_ratio(zoom: Option<&ZoomState>, scale: f32) -> f32 {
    let current = zoom.map(|z| z.zoom_ratio).unwrap_or(1.0);
    let ratio = current * scale;
    match zoom {
        Some(zoom) => zoom.clamp(ratio),
        None => ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_maps_to_center() {
        let factory = MeteringPointFactory::new(Rect::new(10, 5, 40, 20), 1.0);
        let point = factory.create_point(29, 14).unwrap();
        assert!((point.x - 0.4875).abs() < 1e-6);
        assert!((point.y - 0.475).abs() < 1e-6);
        assert_eq!(point.size, METERING_POINT_SIZE);
    }

    #[test]
    fn test_outside_image_is_rejected() {
        let factory = MeteringPointFactory::new(Rect::new(10, 5, 40, 20), 1.0);
        assert!(factory.create_point(9, 10).is_none());
        assert!(factory.create_point(50, 10).is_none());
        assert!(factory.create_point(20, 25).is_none());
        assert!(factory.create_point(10, 5).is_some());
    }

    #[test]
    fn test_digital_zoom_narrows_points() {
        let factory = MeteringPointFactory::new(Rect::new(0, 0, 10, 10), 2.0);
        let corner = factory.create_point(0, 0).unwrap();
        assert!((corner.x - 0.275).abs() < 1e-6);
        let far = factory.create_point(9, 9).unwrap();
        assert!((far.y - 0.725).abs() < 1e-6);
    }

    #[test]
    fn test_tap_tolerates_one_cell() {
        let mut tap = TapTracker::default();
        tap.press(10, 10);
        assert_eq!(tap.release(11, 9), Some((10, 10)));

        tap.press(10, 10);
        assert_eq!(tap.release(13, 10), None);

        // Release without press
        assert_eq!(tap.release(10, 10), None);
    }

    #[test]
    fn test_pinch_clamps_to_range() {
        let zoom = ZoomState {
            zoom_ratio: 2.0,
            min_zoom_ratio: 1.0,
            max_zoom_ratio: 4.0,
        };
        assert!((pinch_zoom_ratio(Some(&zoom), 1.1) - 2.2).abs() < 1e-6);
        assert_eq!(pinch_zoom_ratio(Some(&zoom), 10.0), 4.0);
        assert_eq!(pinch_zoom_ratio(Some(&zoom), 0.1), 1.0);
        assert!((pinch_zoom_ratio(None, 1.1) - 1.1).abs() < 1e-6);
    }
}
