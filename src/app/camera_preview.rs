// SPDX-License-Identifier: GPL-3.0-only

//! Half-block image widgets
//!
//! Each terminal cell shows two vertical pixels: the upper one as the
//! foreground of `▀`, the lower one as the background.

use crate::app::layout::fit_image;
use crate::backends::camera::format_converters::{crop_region, sample_pixel_rgb};
use crate::backends::camera::types::CameraFrame;
use crate::storage::Thumbnail;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, style::Style, widgets::Widget};

/// Live camera preview, letterboxed and digitally zoomed
pub struct PreviewWidget<'a> {
    pub frame: Option<&'a CameraFrame>,
    /// Paint the whole region white (capture feedback)
    pub flash: bool,
    pub placeholder: &'a str,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.flash {
            buf.set_style(area, Style::default().bg(Color::White));
            return;
        }

        let Some(frame) = self.frame else {
            render_centered(self.placeholder, area, buf);
            return;
        };

        let (crop_x, crop_y, crop_w, crop_h) =
            crop_region(frame.width, frame.height, frame.digital_zoom);
        let image = fit_image(area, frame.width, frame.height);
        render_half_blocks(buf, image, crop_w, crop_h, |x, y| {
            sample_pixel_rgb(frame, crop_x + x, crop_y + y)
        });
    }
}

/// Gallery thumbnail
pub struct ThumbnailWidget<'a> {
    pub thumbnail: &'a Thumbnail,
}

impl Widget for ThumbnailWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let thumb = self.thumbnail;
        let image = fit_image(area, thumb.width, thumb.height);
        render_half_blocks(buf, image, thumb.width, thumb.height, |x, y| {
            let idx = ((y * thumb.width + x) * 3) as usize;
            match thumb.rgb.get(idx..idx + 3) {
                Some(px) => (px[0], px[1], px[2]),
                None => (0, 0, 0),
            }
        });
    }
}

pub fn render_centered(text: &str, area: Rect, buf: &mut Buffer) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let width = text.chars().count() as u16;
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height / 2;
    buf.set_stringn(x, y, text, area.width as usize, Style::default());
}

/// Scale a `src_width` x `src_height` image into `image` using half blocks
fn render_half_blocks<F>(buf: &mut Buffer, image: Rect, src_width: u32, src_height: u32, sample: F)
where
    F: Fn(u32, u32) -> (u8, u8, u8),
{
    if image.width == 0 || image.height == 0 || src_width == 0 || src_height == 0 {
        return;
    }
    let x_scale = src_width as f64 / image.width as f64;
    let y_scale = src_height as f64 / (image.height as f64 * 2.0);
    let max_x = src_width - 1;
    let max_y = src_height - 1;

    for ty in 0..image.height {
        for tx in 0..image.width {
            let src_x = ((tx as f64 * x_scale) as u32).min(max_x);
            let src_y_top = ((ty as f64 * 2.0 * y_scale) as u32).min(max_y);
            let src_y_bottom = (((ty as f64 * 2.0 + 1.0) * y_scale) as u32).min(max_y);

            let (r, g, b) = sample(src_x, src_y_top);
            let top = Color::Rgb(r, g, b);
            let (r, g, b) = sample(src_x, src_y_bottom);
            let bottom = Color::Rgb(r, g, b);

            if let Some(cell) = buf.cell_mut((image.x + tx, image.y + ty)) {
                cell.set_char('▀');
                cell.set_fg(top);
                cell.set_bg(bottom);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{CaptureResult, PixelFormat};
    use std::sync::Arc;
    use std::time::Instant;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> CameraFrame {
        let data: Vec<u8> = rgb.iter().copied().cycle().take((width * height * 3) as usize).collect();
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::RGB24,
            stride: width * 3,
            sequence: 0,
            captured_at: Instant::now(),
            digital_zoom: 1.0,
            result: CaptureResult::default(),
        }
    }

    #[test]
    fn test_preview_paints_half_blocks() {
        let frame = solid_frame(40, 30, [200, 10, 20]);
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        PreviewWidget {
            frame: Some(&frame),
            flash: false,
            placeholder: "",
        }
        .render(area, &mut buf);

        // 4:3 in 20x20 pixels → 20x15 pixels, rows 1..8
        let cell = &buf[(10, 4)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(200, 10, 20));
        assert_eq!(buf[(10, 0)].symbol(), " ");
    }

    #[test]
    fn test_flash_whites_out_region() {
        let frame = solid_frame(8, 6, [0, 0, 0]);
        let area = Rect::new(0, 0, 8, 4);
        let mut buf = Buffer::empty(area);
        PreviewWidget {
            frame: Some(&frame),
            flash: true,
            placeholder: "",
        }
        .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].bg, Color::White);
        assert_eq!(buf[(7, 3)].bg, Color::White);
    }

    #[test]
    fn test_placeholder_without_frame() {
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        PreviewWidget {
            frame: None,
            flash: false,
            placeholder: "Starting",
        }
        .render(area, &mut buf);
        assert_eq!(buf[(6, 1)].symbol(), "S");
    }
}
