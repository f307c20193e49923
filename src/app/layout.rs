// SPDX-License-Identifier: GPL-3.0-only

//! Screen geometry shared by rendering and hit-testing
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ [Torch ○]  1.0×  Camera name             │ top bar
//! ├──────────────────────────────────────────┤
//! │                                          │
//! │              preview image               │
//! │                                          │
//! ├──────────────────────────────────────────┤
//! │                 toast                    │
//! ├──────────────────────────────────────────┤
//! │ [ 3 photos ]      ( ● )      [ All ]     │ bottom bar
//! └──────────────────────────────────────────┘
//! ```

use crate::constants::{GALLERY_CELL_HEIGHT, GALLERY_CELL_WIDTH};
use ratatui::layout::Rect;

const TOP_BAR_HEIGHT: u16 = 1;
const TOAST_HEIGHT: u16 = 1;
const BOTTOM_BAR_HEIGHT: u16 = 3;
const TORCH_BUTTON_WIDTH: u16 = 11;
const SIDE_BUTTON_WIDTH: u16 = 14;
const SHUTTER_BUTTON_WIDTH: u16 = 9;

/// Clickable controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Torch,
    SessionPhotos,
    Shutter,
    AllPhotos,
}

/// Rectangles of every screen region for one terminal size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub area: Rect,
    pub top_bar: Rect,
    pub preview: Rect,
    pub toast: Rect,
    pub bottom_bar: Rect,
    pub torch_button: Rect,
    pub photos_button: Rect,
    pub shutter_button: Rect,
    pub all_photos_button: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let top_bar = Rect::new(area.x, area.y, area.width, TOP_BAR_HEIGHT.min(area.height));

        let bottom_height = BOTTOM_BAR_HEIGHT.min(area.height.saturating_sub(top_bar.height));
        let bottom_bar = Rect::new(
            area.x,
            area.y + area.height - bottom_height,
            area.width,
            bottom_height,
        );

        let toast_height = TOAST_HEIGHT
            .min(area.height.saturating_sub(top_bar.height + bottom_bar.height));
        let toast = Rect::new(area.x, bottom_bar.y - toast_height, area.width, toast_height);

        let preview_y = top_bar.y + top_bar.height;
        let preview = Rect::new(
            area.x,
            preview_y,
            area.width,
            toast.y.saturating_sub(preview_y),
        );

        let torch_button = Rect::new(
            top_bar.x + 1,
            top_bar.y,
            TORCH_BUTTON_WIDTH,
            top_bar.height,
        )
        .intersection(top_bar);

        let photos_button = Rect::new(
            bottom_bar.x + 1,
            bottom_bar.y,
            SIDE_BUTTON_WIDTH,
            bottom_bar.height,
        )
        .intersection(bottom_bar);
        let shutter_button = Rect::new(
            bottom_bar.x + bottom_bar.width.saturating_sub(SHUTTER_BUTTON_WIDTH) / 2,
            bottom_bar.y,
            SHUTTER_BUTTON_WIDTH,
            bottom_bar.height,
        )
        .intersection(bottom_bar);
        let all_photos_button = Rect::new(
            (bottom_bar.x + bottom_bar.width).saturating_sub(SIDE_BUTTON_WIDTH + 1),
            bottom_bar.y,
            SIDE_BUTTON_WIDTH,
            bottom_bar.height,
        )
        .intersection(bottom_bar);

        Self {
            area,
            top_bar,
            preview,
            toast,
            bottom_bar,
            torch_button,
            photos_button,
            shutter_button,
            all_photos_button,
        }
    }

    /// Size of the preview region in half-block pixels
    pub fn preview_pixels(&self) -> (u32, u32) {
        (self.preview.width as u32, self.preview.height as u32 * 2)
    }

    /// Grid area of the gallery overlay: the preview region inside a border
    pub fn gallery_grid_area(&self) -> Rect {
        Rect::new(
            self.preview.x + 1,
            self.preview.y + 1,
            self.preview.width.saturating_sub(2),
            self.preview.height.saturating_sub(2),
        )
    }

    /// Control under a cell. The torch button only counts when shown.
    pub fn control_at(&self, column: u16, row: u16, torch_visible: bool) -> Option<Control> {
        if torch_visible && contains(self.torch_button, column, row) {
            return Some(Control::Torch);
        }
        // Shutter first: on narrow terminals the buttons may overlap
        if contains(self.shutter_button, column, row) {
            return Some(Control::Shutter);
        }
        if contains(self.photos_button, column, row) {
            return Some(Control::SessionPhotos);
        }
        if contains(self.all_photos_button, column, row) {
            return Some(Control::AllPhotos);
        }
        None
    }
}

pub fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && row >= rect.y
        && column < rect.x.saturating_add(rect.width)
        && row < rect.y.saturating_add(rect.height)
}

/// Largest rectangle with the image's aspect ratio that fits `area`, centred.
///
/// Each cell shows two vertically stacked pixels.
pub fn fit_image(area: Rect, image_width: u32, image_height: u32) -> Rect {
    if image_width == 0 || image_height == 0 || area.width == 0 || area.height == 0 {
        return Rect::new(area.x, area.y, 0, 0);
    }
    let frame_aspect = image_width as f64 / image_height as f64;
    let term_width = area.width as f64;
    let term_height = (area.height as u32 * 2) as f64;

    let (display_width, display_height) = if term_width / term_height > frame_aspect {
        let h = term_height;
        let w = h * frame_aspect;
        (w as u16, (h / 2.0) as u16)
    } else {
        let w = term_width;
        let h = w / frame_aspect;
        (w as u16, (h / 2.0) as u16)
    };
    let display_width = display_width.min(area.width);
    let display_height = display_height.min(area.height);

    Rect::new(
        area.x + (area.width - display_width) / 2,
        area.y + (area.height - display_height) / 2,
        display_width,
        display_height,
    )
}

/// Columns and rows of gallery cells that fit `area`
pub fn gallery_grid(area: Rect) -> (u16, u16) {
    (
        (area.width / GALLERY_CELL_WIDTH).max(1),
        (area.height / GALLERY_CELL_HEIGHT).max(1),
    )
}

/// Page slot under a cell of the gallery grid
pub fn gallery_slot_at(area: Rect, column: u16, row: u16) -> Option<usize> {
    if !contains(area, column, row) {
        return None;
    }
    let (columns, rows) = gallery_grid(area);
    let col = (column - area.x) / GALLERY_CELL_WIDTH;
    let r = (row - area.y) / GALLERY_CELL_HEIGHT;
    if col >= columns || r >= rows {
        return None;
    }
    Some(r as usize * columns as usize + col as usize)
}

/// Rectangle of the `slot`-th cell on a gallery page
pub fn gallery_cell(area: Rect, slot: usize) -> Rect {
    let (columns, _) = gallery_grid(area);
    let col = (slot % columns as usize) as u16;
    let row = (slot / columns as usize) as u16;
    Rect::new(
        area.x + col * GALLERY_CELL_WIDTH,
        area.y + row * GALLERY_CELL_HEIGHT,
        GALLERY_CELL_WIDTH,
        GALLERY_CELL_HEIGHT,
    )
    .intersection(area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_stack_vertically() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.top_bar, Rect::new(0, 0, 80, 1));
        assert_eq!(layout.preview, Rect::new(0, 1, 80, 19));
        assert_eq!(layout.toast, Rect::new(0, 20, 80, 1));
        assert_eq!(layout.bottom_bar, Rect::new(0, 21, 80, 3));
        assert_eq!(layout.preview_pixels(), (80, 38));
    }

    #[test]
    fn test_tiny_terminal_does_not_underflow() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 5, 2));
        assert_eq!(layout.preview.height, 0);
        assert!(layout.shutter_button.width <= 5);
    }

    #[test]
    fn test_control_hit_testing() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 80, 24));
        let shutter = layout.shutter_button;
        assert_eq!(
            layout.control_at(shutter.x + 1, shutter.y + 1, false),
            Some(Control::Shutter)
        );
        assert_eq!(layout.control_at(2, 22, false), Some(Control::SessionPhotos));
        assert_eq!(layout.control_at(78, 22, false), Some(Control::AllPhotos));
        assert_eq!(layout.control_at(2, 0, true), Some(Control::Torch));
        assert_eq!(layout.control_at(2, 0, false), None);
        assert_eq!(layout.control_at(40, 10, true), None);
    }

    #[test]
    fn test_fit_image_letterboxes() {
        // 80x38 pixels; a 4:3 frame is limited by height
        let rect = fit_image(Rect::new(0, 1, 80, 19), 640, 480);
        assert_eq!(rect.height, 19);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.x, 15);

        // Wide frame in a tall area is limited by width
        let rect = fit_image(Rect::new(0, 0, 40, 40), 1920, 1080);
        assert_eq!(rect.width, 40);
        assert_eq!(rect.height, 11);
        assert_eq!(rect.y, 14);
    }

    #[test]
    fn test_gallery_cells() {
        let area = Rect::new(1, 1, 78, 20);
        assert_eq!(gallery_grid(area), (3, 2));
        assert_eq!(gallery_cell(area, 4), Rect::new(25, 11, 24, 10));
        assert_eq!(gallery_slot_at(area, 26, 12), Some(4));
        assert_eq!(gallery_slot_at(area, 1, 1), Some(0));
        // Leftover columns past the last full cell
        assert_eq!(gallery_slot_at(area, 77, 2), None);
        assert_eq!(gallery_slot_at(area, 0, 0), None);
    }
}
