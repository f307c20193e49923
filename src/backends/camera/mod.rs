// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! A backend finds cameras and binds one of them to the preview and
//! image-capture use cases. Binding yields a session: the control surface of
//! the open camera (torch, zoom, focus) plus its still-frame source. Frames,
//! state errors and control changes flow back through the channels handed to
//! [`CameraBackend::bind`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Screen controller │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackendManager│  ← Shared handle, camera/format selection
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!       ┌────┴────────┐
//!       ▼             ▼
//!   ┌──────┐   ┌─────────────┐
//!   │ V4L2 │   │ Test pattern│
//!   └──────┘   └─────────────┘
//! ```

pub mod convergence;
pub mod format_converters;
pub mod manager;
pub mod test_pattern;
pub mod types;
pub mod v4l2;
pub mod v4l2_controls;

pub use manager::CameraBackendManager;
pub use types::*;

use std::sync::Arc;
use tracing::info;

/// Camera provider: discovers cameras and binds use cases to one of them
pub trait CameraBackend: Send + Sync {
    fn backend_type(&self) -> CameraBackendType;

    /// Whether the user may open camera devices
    ///
    /// There is no interactive grant on Linux: this reports whether device
    /// nodes exist that the current user is refused access to.
    fn has_permission(&self) -> bool;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Supported formats for a specific camera device
    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat>;

    /// Open a camera and start the requested use cases.
    ///
    /// Any previous session of the caller must be unbound first. Frames are
    /// sent with `try_send` and dropped when the receiver lags.
    fn bind(
        &self,
        request: &BindRequest,
        channels: SessionChannels,
    ) -> BackendResult<Box<dyn CameraSession>>;
}

/// A bound camera
///
/// Control calls return once the request has been handed to the device; the
/// resulting torch and zoom values are reported as [`CameraEvent`]s.
pub trait CameraSession: Send + Sync {
    /// Device, format and current control values
    fn camera_info(&self) -> CameraInfo;

    /// Latest frame, for the image-capture use case
    fn still_source(&self) -> StillSource;

    /// Turn the torch on or off
    fn enable_torch(&self, enabled: bool) -> BackendResult<()>;

    /// Set the zoom ratio; must lie within the reported zoom range
    fn set_zoom_ratio(&self, ratio: f32) -> BackendResult<()>;

    /// Focus (and optionally meter) on a point, reverting after the action's
    /// auto-cancel duration
    fn start_focus_and_metering(&self, action: FocusMeteringAction) -> BackendResult<()>;

    /// Stop streaming and release the device. Idempotent.
    fn unbind(&self);
}

/// Pick the camera a bind request refers to.
///
/// An explicit device path wins. Otherwise the first camera with the requested
/// facing is used, falling back to the first camera when none reports that
/// facing (most V4L2 devices report none at all).
pub fn select_camera<'a>(
    cameras: &'a [CameraDevice],
    request: &BindRequest,
) -> Option<&'a CameraDevice> {
    if let Some(path) = &request.device_path
        && let Some(camera) = cameras.iter().find(|c| &c.path == path)
    {
        return Some(camera);
    }

    if let Some(camera) = cameras
        .iter()
        .find(|c| c.facing == Some(request.lens_facing))
    {
        return Some(camera);
    }

    let fallback = cameras.first()?;
    info!(
        requested = %request.lens_facing,
        camera = %fallback.name,
        "No camera with requested facing, using first camera"
    );
    Some(fallback)
}

/// Choose the stream format for a bind request.
///
/// Among formats of the requested aspect ratio within `max_pixels`, the
/// largest wins, then the highest framerate. Without such a format the
/// largest format within budget of any ratio is used, then the smallest
/// format overall.
pub fn select_format(
    formats: &[CameraFormat],
    aspect_ratio: AspectRatio,
    max_pixels: u64,
) -> Option<CameraFormat> {
    let rank = |f: &&CameraFormat| {
        (
            f.pixels(),
            f.framerate.map(|fps| fps.as_f64() as u64).unwrap_or(0),
        )
    };

    formats
        .iter()
        .filter(|f| f.pixels() <= max_pixels && f.aspect_ratio() == aspect_ratio)
        .max_by_key(rank)
        .or_else(|| {
            formats
                .iter()
                .filter(|f| f.pixels() <= max_pixels)
                .max_by_key(rank)
        })
        .or_else(|| formats.iter().min_by_key(|f| f.pixels()))
        .cloned()
}

/// Get a concrete backend instance
pub fn get_backend(backend_type: CameraBackendType) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Arc::new(v4l2::V4l2Backend::new()),
        CameraBackendType::TestPattern => Arc::new(test_pattern::TestPatternBackend::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(path: &str, facing: Option<LensFacing>) -> CameraDevice {
        CameraDevice {
            name: path.to_string(),
            path: path.to_string(),
            driver: None,
            facing,
        }
    }

    fn format(width: u32, height: u32, fps: u32) -> CameraFormat {
        CameraFormat {
            width,
            height,
            framerate: Some(Framerate::from_int(fps)),
            pixel_format: "YUYV".to_string(),
        }
    }

    fn request(facing: LensFacing) -> BindRequest {
        BindRequest {
            lens_facing: facing,
            device_path: None,
            aspect_ratio: AspectRatio::Ratio4_3,
            use_cases: vec![UseCase::Preview, UseCase::ImageCapture],
            max_pixels: crate::constants::DEFAULT_MAX_CAPTURE_PIXELS,
            af_mode: AfMode::ContinuousPicture,
        }
    }

    #[test]
    fn test_select_camera_by_facing() {
        let cameras = vec![
            camera("/dev/video0", Some(LensFacing::Front)),
            camera("/dev/video2", Some(LensFacing::Back)),
        ];
        let selected = select_camera(&cameras, &request(LensFacing::Back)).unwrap();
        assert_eq!(selected.path, "/dev/video2");
    }

    #[test]
    fn test_select_camera_falls_back_to_first() {
        let cameras = vec![camera("/dev/video0", None), camera("/dev/video2", None)];
        let selected = select_camera(&cameras, &request(LensFacing::Back)).unwrap();
        assert_eq!(selected.path, "/dev/video0");
        assert!(select_camera(&[], &request(LensFacing::Back)).is_none());
    }

    #[test]
    fn test_select_camera_prefers_path() {
        let cameras = vec![
            camera("/dev/video0", Some(LensFacing::Back)),
            camera("/dev/video2", Some(LensFacing::Front)),
        ];
        let mut req = request(LensFacing::Back);
        req.device_path = Some("/dev/video2".to_string());
        assert_eq!(select_camera(&cameras, &req).unwrap().path, "/dev/video2");

        req.device_path = Some("/dev/video9".to_string());
        assert_eq!(select_camera(&cameras, &req).unwrap().path, "/dev/video0");
    }

    #[test]
    fn test_select_format_by_ratio() {
        let formats = vec![
            format(640, 480, 30),
            format(1280, 720, 30),
            format(1280, 960, 15),
            format(1920, 1080, 30),
            format(2592, 1944, 5),
        ];
        let max = crate::constants::DEFAULT_MAX_CAPTURE_PIXELS;

        let four_three = select_format(&formats, AspectRatio::Ratio4_3, max).unwrap();
        assert_eq!((four_three.width, four_three.height), (1280, 960));

        let wide = select_format(&formats, AspectRatio::Ratio16_9, max).unwrap();
        assert_eq!((wide.width, wide.height), (1920, 1080));
    }

    #[test]
    fn test_select_format_prefers_framerate_then_falls_back() {
        let formats = vec![format(640, 480, 15), format(640, 480, 30)];
        let picked = select_format(&formats, AspectRatio::Ratio4_3, u64::MAX).unwrap();
        assert_eq!(picked.framerate, Some(Framerate::from_int(30)));

        // No 16:9 mode: largest within budget
        let picked = select_format(&formats, AspectRatio::Ratio16_9, u64::MAX).unwrap();
        assert_eq!((picked.width, picked.height), (640, 480));

        // Nothing within budget: smallest overall
        let picked = select_format(&[format(4000, 3000, 5)], AspectRatio::Ratio4_3, 100).unwrap();
        assert_eq!(picked.width, 4000);

        assert!(select_format(&[], AspectRatio::Ratio4_3, u64::MAX).is_none());
    }
}
