// SPDX-License-Identifier: GPL-3.0-only

//! CPU pixel sampling and conversion for camera frames
//!
//! The preview samples individual pixels (it only needs a few thousand per
//! frame), capture converts whole frames to RGB for encoding, and the 3A
//! estimator reads coarse statistics from a sparse grid.

use super::types::{CameraFrame, PixelFormat};
use image::RgbImage;

/// Sample one pixel as RGB. Out-of-range coordinates clamp to the edge.
pub fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    if frame.width == 0 || frame.height == 0 {
        return (0, 0, 0);
    }
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let data: &[u8] = &frame.data;

    match frame.format {
        PixelFormat::RGBA | PixelFormat::RGB24 => {
            let bpp = frame.format.bytes_per_pixel();
            let idx = (y * frame.stride + x * bpp) as usize;
            if idx + 2 < data.len() {
                (data[idx], data[idx + 1], data[idx + 2])
            } else {
                (0, 0, 0)
            }
        }
        PixelFormat::Gray8 => {
            let idx = (y * frame.stride + x) as usize;
            match data.get(idx) {
                Some(&v) => (v, v, v),
                None => (0, 0, 0),
            }
        }
        PixelFormat::YUYV => {
            // Packed 4:2:2: Y0 U Y1 V, two pixels share chroma
            let base = (y * frame.stride + (x & !1) * 2) as usize;
            if base + 3 >= data.len() {
                return (0, 0, 0);
            }
            let luma = if x & 1 == 0 { data[base] } else { data[base + 2] };
            yuv_to_rgb(luma, data[base + 1], data[base + 3])
        }
        PixelFormat::UYVY => {
            // Packed 4:2:2: U Y0 V Y1
            let base = (y * frame.stride + (x & !1) * 2) as usize;
            if base + 3 >= data.len() {
                return (0, 0, 0);
            }
            let luma = if x & 1 == 0 {
                data[base + 1]
            } else {
                data[base + 3]
            };
            yuv_to_rgb(luma, data[base], data[base + 2])
        }
    }
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Region of the frame that survives a center crop by `zoom`.
///
/// Returns (x, y, width, height) in frame pixels.
pub fn crop_region(width: u32, height: u32, zoom: f32) -> (u32, u32, u32, u32) {
    let zoom = if zoom.is_finite() { zoom.max(1.0) } else { 1.0 };
    let crop_w = ((width as f32 / zoom).round() as u32).clamp(1, width.max(1));
    let crop_h = ((height as f32 / zoom).round() as u32).clamp(1, height.max(1));
    ((width - crop_w) / 2, (height - crop_h) / 2, crop_w, crop_h)
}

/// Convert a full frame to an RGB image, applying its pending digital zoom.
///
/// A zoomed frame is cropped and scaled back up so stills keep the stream's
/// resolution.
pub fn frame_to_rgb_image(frame: &CameraFrame) -> Option<RgbImage> {
    if frame.width == 0 || frame.height == 0 {
        return None;
    }
    let (cx, cy, cw, ch) = crop_region(frame.width, frame.height, frame.digital_zoom);

    let mut rgb = Vec::with_capacity((cw * ch * 3) as usize);
    for y in cy..cy + ch {
        for x in cx..cx + cw {
            let (r, g, b) = sample_pixel_rgb(frame, x, y);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }
    let cropped = RgbImage::from_raw(cw, ch, rgb)?;

    if cw == frame.width && ch == frame.height {
        return Some(cropped);
    }
    Some(image::imageops::resize(
        &cropped,
        frame.width,
        frame.height,
        image::imageops::FilterType::Triangle,
    ))
}

/// Coarse statistics of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Mean luma, 0-255
    pub mean_luma: f32,
    /// Mean red / mean green
    pub red_gain: f32,
    /// Mean blue / mean green
    pub blue_gain: f32,
    /// Mean absolute luma difference between horizontal grid neighbours
    pub sharpness: f32,
}

/// Compute [`FrameStats`] over a `grid` x `grid` sample lattice
pub fn frame_stats(frame: &CameraFrame, grid: u32) -> FrameStats {
    let grid = grid.max(2);
    if frame.width == 0 || frame.height == 0 {
        return FrameStats::default();
    }

    let (mut sum_r, mut sum_g, mut sum_b, mut sum_luma) = (0f64, 0f64, 0f64, 0f64);
    let mut sum_gradient = 0f64;
    let mut gradient_samples = 0u32;

    for gy in 0..grid {
        let y = gy * (frame.height - 1) / (grid - 1);
        let mut prev_luma: Option<f32> = None;
        for gx in 0..grid {
            let x = gx * (frame.width - 1) / (grid - 1);
            let (r, g, b) = sample_pixel_rgb(frame, x, y);
            let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            sum_r += r as f64;
            sum_g += g as f64;
            sum_b += b as f64;
            sum_luma += luma as f64;
            if let Some(prev) = prev_luma {
                sum_gradient += (luma - prev).abs() as f64;
                gradient_samples += 1;
            }
            prev_luma = Some(luma);
        }
    }

    let samples = (grid * grid) as f64;
    let green = (sum_g / samples).max(1.0);
    FrameStats {
        mean_luma: (sum_luma / samples) as f32,
        red_gain: ((sum_r / samples) / green) as f32,
        blue_gain: ((sum_b / samples) / green) as f32,
        sharpness: if gradient_samples == 0 {
            0.0
        } else {
            (sum_gradient / gradient_samples as f64) as f32
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CaptureResult;
    use std::sync::Arc;
    use std::time::Instant;

    fn frame(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> CameraFrame {
        CameraFrame {
            width,
            height,
            stride: width * format.bytes_per_pixel(),
            data: Arc::from(data),
            format,
            sequence: 0,
            captured_at: Instant::now(),
            digital_zoom: 1.0,
            result: CaptureResult::default(),
        }
    }

    #[test]
    fn test_yuv_gray_point() {
        // Neutral chroma keeps luma as gray
        assert_eq!(yuv_to_rgb(128, 128, 128), (128, 128, 128));
        assert_eq!(yuv_to_rgb(0, 128, 128), (0, 0, 0));
        assert_eq!(yuv_to_rgb(255, 128, 128), (255, 255, 255));
    }

    #[test]
    fn test_sample_yuyv_pair() {
        // Two pixels: Y0=50, Y1=200, neutral chroma
        let f = frame(PixelFormat::YUYV, 2, 1, vec![50, 128, 200, 128]);
        assert_eq!(sample_pixel_rgb(&f, 0, 0), (50, 50, 50));
        assert_eq!(sample_pixel_rgb(&f, 1, 0), (200, 200, 200));
    }

    #[test]
    fn test_sample_uyvy_pair() {
        let f = frame(PixelFormat::UYVY, 2, 1, vec![128, 10, 128, 20]);
        assert_eq!(sample_pixel_rgb(&f, 0, 0), (10, 10, 10));
        assert_eq!(sample_pixel_rgb(&f, 1, 0), (20, 20, 20));
    }

    #[test]
    fn test_sample_clamps_coordinates() {
        let f = frame(PixelFormat::RGB24, 1, 1, vec![1, 2, 3]);
        assert_eq!(sample_pixel_rgb(&f, 10, 10), (1, 2, 3));
    }

    #[test]
    fn test_crop_region() {
        assert_eq!(crop_region(640, 480, 1.0), (0, 0, 640, 480));
        assert_eq!(crop_region(640, 480, 2.0), (160, 120, 320, 240));
        // Below 1x never enlarges the region
        assert_eq!(crop_region(640, 480, 0.5), (0, 0, 640, 480));
        assert_eq!(crop_region(640, 480, f32::NAN), (0, 0, 640, 480));
    }

    #[test]
    fn test_zoomed_frame_keeps_size() {
        let mut f = frame(PixelFormat::Gray8, 8, 6, (0..48).collect());
        f.digital_zoom = 2.0;
        let img = frame_to_rgb_image(&f).unwrap();
        assert_eq!(img.dimensions(), (8, 6));
    }

    #[test]
    fn test_frame_stats_flat_and_edges() {
        let flat = frame(PixelFormat::Gray8, 16, 16, vec![100; 256]);
        let stats = frame_stats(&flat, 8);
        assert!((stats.mean_luma - 100.0).abs() < 0.5);
        assert!((stats.red_gain - 1.0).abs() < 1e-3);
        assert_eq!(stats.sharpness, 0.0);

        let stripes: Vec<u8> = (0..256)
            .map(|i| if (i % 16) % 2 == 0 { 0 } else { 255 })
            .collect();
        let striped = frame(PixelFormat::Gray8, 16, 16, stripes);
        assert!(frame_stats(&striped, 16).sharpness > 100.0);
    }
}
