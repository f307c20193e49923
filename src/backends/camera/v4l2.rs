// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Streams `/dev/video*` capture nodes through memory-mapped buffers on a
//! dedicated capture thread. Compressed MJPG frames are decoded to RGB24 there;
//! packed YUV and gray frames are passed through and converted while sampling.
//!
//! Controls go through raw ioctls (see [`super::v4l2_controls`]):
//! - zoom: `V4L2_CID_ZOOM_ABSOLUTE` when present, otherwise a center crop
//! - torch: sysfs `*:flash` LEDs, or `V4L2_CID_FLASH_LED_MODE`
//! - focus: `V4L2_CID_AUTO_FOCUS_START` with spot metering; continuous AF is
//!   restored when the action's auto-cancel elapses
//!
//! Per-frame 3A state comes from [`super::convergence`], fed by the hardware
//! focus status where the driver exposes it.

use super::convergence::{ConvergenceTracker, FocusStatus, HardwareFocus};
use super::format_converters::frame_stats;
use super::types::*;
use super::v4l2_controls::{self as controls, ControlHandle, ControlInfo};
use super::{CameraBackend, CameraSession, select_camera, select_format};
use crate::constants::MAX_DIGITAL_ZOOM;
use crate::flash::{self, FlashDevice};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Pixel formats the capture thread can turn into preview frames
const SUPPORTED_FOURCCS: [&str; 5] = ["MJPG", "YUYV", "UYVY", "GREY", "RGB3"];

/// Sample lattice used for 3A statistics
const STATS_GRID: u32 = 24;

/// Consecutive dequeue failures before the stream is declared lost
const MAX_CAPTURE_FAILURES: u32 = 30;

/// Resolutions offered for stepwise/continuous frame size ranges
const STEPWISE_SIZES: [(u32, u32); 6] = [
    (640, 480),
    (1280, 720),
    (1280, 960),
    (1600, 1200),
    (1920, 1080),
    (2592, 1944),
];

/// List `/dev/video*` nodes in numeric order
fn video_nodes() -> Vec<String> {
    let mut nodes: Vec<(u32, String)> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, format!("/dev/{}", name)))
        })
        .collect();
    nodes.sort();
    nodes.into_iter().map(|(_, path)| path).collect()
}

fn fourcc_string(fourcc: &FourCC) -> String {
    fourcc.str().map(str::to_string).unwrap_or_default()
}

/// Query the formats a device can stream that this backend can decode
fn enumerate_formats(dev: &Device) -> Vec<CameraFormat> {
    let mut formats = Vec::new();

    let Ok(descriptions) = dev.enum_formats() else {
        return formats;
    };

    for desc in descriptions {
        let pixel_format = fourcc_string(&desc.fourcc);
        if !SUPPORTED_FOURCCS.contains(&pixel_format.as_str()) {
            debug!(fourcc = %pixel_format, "Skipping unsupported pixel format");
            continue;
        }
        let Ok(sizes) = dev.enum_framesizes(desc.fourcc) else {
            continue;
        };
        for size in sizes {
            match size.size {
                v4l::framesize::FrameSizeEnum::Discrete(discrete) => {
                    let framerate = dev
                        .enum_frameintervals(desc.fourcc, discrete.width, discrete.height)
                        .ok()
                        .and_then(|intervals| {
                            intervals
                                .into_iter()
                                .filter_map(|interval| match interval.interval {
                                    v4l::frameinterval::FrameIntervalEnum::Discrete(frac)
                                        if frac.numerator > 0 =>
                                    {
                                        Some(Framerate::new(frac.denominator, frac.numerator))
                                    }
                                    _ => None,
                                })
                                .max_by(|a, b| a.as_f64().total_cmp(&b.as_f64()))
                        });
                    formats.push(CameraFormat {
                        width: discrete.width,
                        height: discrete.height,
                        framerate,
                        pixel_format: pixel_format.clone(),
                    });
                }
                v4l::framesize::FrameSizeEnum::Stepwise(step) => {
                    for (w, h) in STEPWISE_SIZES {
                        if w >= step.min_width
                            && w <= step.max_width
                            && h >= step.min_height
                            && h <= step.max_height
                        {
                            formats.push(CameraFormat {
                                width: w,
                                height: h,
                                framerate: None,
                                pixel_format: pixel_format.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    formats
}

/// Order MJPG modes first so that, among otherwise equal modes, format
/// selection (which keeps the last maximum) lands on an uncompressed one
fn prefer_uncompressed(formats: &mut [CameraFormat]) {
    formats.sort_by_key(|f| f.pixel_format != "MJPG");
}

/// Physical placement from `V4L2_CID_CAMERA_ORIENTATION`, or external for UVC
fn lens_facing(path: &str, driver: &str) -> Option<LensFacing> {
    match controls::get_control(path, controls::V4L2_CID_CAMERA_ORIENTATION) {
        Some(controls::V4L2_CAMERA_ORIENTATION_FRONT) => Some(LensFacing::Front),
        Some(controls::V4L2_CAMERA_ORIENTATION_BACK) => Some(LensFacing::Back),
        Some(controls::V4L2_CAMERA_ORIENTATION_EXTERNAL) => Some(LensFacing::External),
        _ if driver == "uvcvideo" => Some(LensFacing::External),
        _ => None,
    }
}

/// Turn one dequeued buffer into frame data.
///
/// Returns the pixel data, its layout and row stride, or None when the
/// buffer is short or fails to decode.
pub fn decode_frame(
    buf: &[u8],
    fourcc: &str,
    width: u32,
    height: u32,
    stride: u32,
) -> Option<(Arc<[u8]>, PixelFormat, u32)> {
    if fourcc == "MJPG" {
        let img = match image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                debug!(error = %e, "Dropping undecodable MJPG frame");
                return None;
            }
        };
        if img.dimensions() != (width, height) {
            debug!(
                got = ?img.dimensions(),
                expected = ?(width, height),
                "MJPG frame size mismatch"
            );
            return None;
        }
        return Some((Arc::from(img.into_raw()), PixelFormat::RGB24, width * 3));
    }

    let format = PixelFormat::from_fourcc(fourcc)?;
    let stride = stride.max(width * format.bytes_per_pixel());
    let needed = (stride * height) as usize;
    if buf.len() < needed {
        debug!(len = buf.len(), needed, "Short frame buffer");
        return None;
    }
    Some((Arc::from(&buf[..needed]), format, stride))
}

/// V4L2 camera provider
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn has_permission(&self) -> bool {
        let nodes = video_nodes();
        if nodes.is_empty() {
            return true;
        }
        let denied = nodes
            .iter()
            .filter(|path| {
                matches!(
                    std::fs::File::open(path),
                    Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied
                )
            })
            .count();
        if denied == nodes.len() {
            warn!(count = denied, "All video devices refuse access");
            return false;
        }
        true
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut cameras = Vec::new();

        for path in video_nodes() {
            let dev = match Device::with_path(&path) {
                Ok(dev) => dev,
                Err(e) => {
                    debug!(path, error = %e, "Cannot open video node");
                    continue;
                }
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                continue;
            }
            // UVC exposes a metadata node per camera; it has no image formats
            if enumerate_formats(&dev).is_empty() {
                debug!(path, "Skipping node without usable formats");
                continue;
            }

            let facing = lens_facing(&path, &caps.driver);
            info!(path, card = %caps.card, driver = %caps.driver, ?facing, "Found camera");
            cameras.push(CameraDevice {
                name: caps.card.clone(),
                path,
                driver: Some(caps.driver.clone()),
                facing,
            });
        }

        cameras
    }

    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat> {
        match Device::with_path(&device.path) {
            Ok(dev) => {
                let mut formats = enumerate_formats(&dev);
                prefer_uncompressed(&mut formats);
                formats
            }
            Err(e) => {
                warn!(path = %device.path, error = %e, "Cannot open camera for format query");
                Vec::new()
            }
        }
    }

    fn bind(
        &self,
        request: &BindRequest,
        channels: SessionChannels,
    ) -> BackendResult<Box<dyn CameraSession>> {
        let cameras = self.enumerate_cameras();
        let device = select_camera(&cameras, request)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("No cameras found".to_string()))?;

        let formats = self.get_formats(&device);
        let format = select_format(&formats, request.aspect_ratio, request.max_pixels)
            .ok_or_else(|| {
                BackendError::FormatNotSupported(format!("no usable format on {}", device.path))
            })?;

        let session = V4l2Session::start(device, format, request, channels)?;
        Ok(Box::new(session))
    }
}

/// Which focus and zoom controls a device offers
#[derive(Debug, Clone, Default)]
struct ControlCaps {
    zoom: Option<ControlInfo>,
    focus_auto: bool,
    focus_start: bool,
    focus_status: bool,
    lens_position: bool,
    metering: bool,
}

impl ControlCaps {
    fn probe(handle: &ControlHandle) -> Self {
        let caps = Self {
            zoom: handle
                .query(controls::V4L2_CID_ZOOM_ABSOLUTE)
                .filter(|info| !info.is_disabled() && info.maximum > info.minimum),
            focus_auto: handle.has(controls::V4L2_CID_FOCUS_AUTO),
            focus_start: handle.has(controls::V4L2_CID_AUTO_FOCUS_START),
            focus_status: handle.has(controls::V4L2_CID_AUTO_FOCUS_STATUS),
            lens_position: handle.has(controls::V4L2_CID_FOCUS_ABSOLUTE),
            metering: handle.has(controls::V4L2_CID_EXPOSURE_METERING),
        };
        debug!(path = handle.path(), ?caps, "Probed camera controls");
        caps
    }
}

#[derive(Debug)]
enum TorchControl {
    Sysfs(Vec<FlashDevice>),
    LedMode,
    None,
}

/// State shared between the session, its capture thread and focus timers
#[derive(Debug)]
struct SharedControls {
    zoom: ZoomState,
    torch: TorchState,
    /// Bumped by each focus request; stale auto-cancel timers compare against it
    focus_generation: u64,
    focus_triggered: bool,
    /// Framing or focus changed; convergence history is void
    reset_estimator: bool,
}

fn lock_shared(shared: &Mutex<SharedControls>) -> MutexGuard<'_, SharedControls> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// A streaming V4L2 camera
pub struct V4l2Session {
    device: CameraDevice,
    format: CameraFormat,
    control_handle: Option<ControlHandle>,
    caps: ControlCaps,
    torch_control: TorchControl,
    af_mode: AfMode,
    shared: Arc<Mutex<SharedControls>>,
    events: EventSender,
    still: StillSource,
    stop_signal: Arc<AtomicBool>,
    capture_thread: Mutex<Option<JoinHandle<()>>>,
}

impl V4l2Session {
    fn start(
        device: CameraDevice,
        format: CameraFormat,
        request: &BindRequest,
        channels: SessionChannels,
    ) -> BackendResult<Self> {
        channels.send_event(CameraEvent::State(CameraState::new(CameraStatus::Opening)));

        let control_handle = match ControlHandle::open(&device.path) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(path = %device.path, error = %e, "Controls unavailable");
                None
            }
        };
        let caps = control_handle
            .as_ref()
            .map(ControlCaps::probe)
            .unwrap_or_default();

        let zoom = match &caps.zoom {
            Some(info) => {
                let (min, max) = controls::zoom_ratio_range(info, MAX_DIGITAL_ZOOM);
                ZoomState {
                    zoom_ratio: min,
                    min_zoom_ratio: min,
                    max_zoom_ratio: max,
                }
            }
            None => ZoomState {
                zoom_ratio: 1.0,
                min_zoom_ratio: 1.0,
                max_zoom_ratio: MAX_DIGITAL_ZOOM,
            },
        };

        if let (Some(handle), Some(info)) = (&control_handle, &caps.zoom)
            && let Err(e) = handle.set(controls::V4L2_CID_ZOOM_ABSOLUTE, info.minimum)
        {
            warn!(error = %e, "Failed to reset hardware zoom");
        }
        if let Some(handle) = &control_handle
            && caps.focus_auto
        {
            let enabled = i32::from(request.af_mode == AfMode::ContinuousPicture);
            if let Err(e) = handle.set(controls::V4L2_CID_FOCUS_AUTO, enabled) {
                warn!(error = %e, "Failed to set continuous autofocus");
            }
        }

        let torch_control = {
            let leds = if device.facing == Some(LensFacing::External) {
                Vec::new()
            } else {
                FlashDevice::discover()
            };
            if !leds.is_empty() {
                TorchControl::Sysfs(leds)
            } else if control_handle
                .as_ref()
                .is_some_and(|h| h.has(controls::V4L2_CID_FLASH_LED_MODE))
            {
                TorchControl::LedMode
            } else {
                TorchControl::None
            }
        };

        let shared = Arc::new(Mutex::new(SharedControls {
            zoom,
            torch: TorchState::Off,
            focus_generation: 0,
            focus_triggered: false,
            reset_estimator: false,
        }));
        let still = StillSource::new();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let (setup_tx, setup_rx) = std::sync::mpsc::channel();

        let capture = CaptureLoop {
            path: device.path.clone(),
            format: format.clone(),
            hardware_zoom: caps.zoom.is_some(),
            focus_status: caps.focus_status,
            lens_position: caps.lens_position,
            preview: request.wants(UseCase::Preview),
            shared: Arc::clone(&shared),
            still: still.clone(),
            channels: channels.clone(),
            stop_signal: Arc::clone(&stop_signal),
        };
        let handle = thread::spawn(move || capture.run(setup_tx));

        let actual_format = match setup_rx.recv() {
            Ok(Ok(actual)) => actual,
            Ok(Err(state_error)) => {
                let _ = handle.join();
                error!(path = %device.path, error = %state_error, "Failed to start stream");
                return Err(BackendError::Camera(state_error));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(BackendError::InitializationFailed(
                    "capture thread exited during setup".to_string(),
                ));
            }
        };

        channels.send_event(CameraEvent::State(CameraState::new(CameraStatus::Open)));
        info!(
            device = %device.name,
            format = %actual_format,
            hardware_zoom = caps.zoom.is_some(),
            ?torch_control,
            "V4L2 stream started"
        );

        Ok(Self {
            device,
            format: actual_format,
            control_handle,
            caps,
            torch_control,
            af_mode: request.af_mode,
            shared,
            events: channels.events,
            still,
            stop_signal,
            capture_thread: Mutex::new(Some(handle)),
        })
    }

    fn shared(&self) -> MutexGuard<'_, SharedControls> {
        lock_shared(&self.shared)
    }

    fn send_event(&self, event: CameraEvent) {
        let _ = self.events.unbounded_send(event);
    }

    /// Hand focus back to continuous AF and average metering
    fn restore_continuous_focus(path: &str, caps: &ControlCaps, af_mode: AfMode) {
        if caps.metering
            && let Err(e) = controls::set_control(
                path,
                controls::V4L2_CID_EXPOSURE_METERING,
                controls::V4L2_EXPOSURE_METERING_AVERAGE,
            )
        {
            debug!(error = %e, "Failed to restore average metering");
        }
        if caps.focus_start
            && let Err(e) = controls::set_control(path, controls::V4L2_CID_AUTO_FOCUS_STOP, 1)
        {
            debug!(error = %e, "Failed to stop focus scan");
        }
        if caps.focus_auto
            && af_mode == AfMode::ContinuousPicture
            && let Err(e) = controls::set_control(path, controls::V4L2_CID_FOCUS_AUTO, 1)
        {
            warn!(error = %e, "Failed to resume continuous autofocus");
        }
    }
}

impl CameraSession for V4l2Session {
    fn camera_info(&self) -> CameraInfo {
        let shared = self.shared();
        CameraInfo {
            device: self.device.clone(),
            format: self.format.clone(),
            has_flash_unit: !matches!(self.torch_control, TorchControl::None),
            torch_state: shared.torch,
            zoom_state: shared.zoom,
        }
    }

    fn still_source(&self) -> StillSource {
        self.still.clone()
    }

    fn enable_torch(&self, enabled: bool) -> BackendResult<()> {
        match &self.torch_control {
            TorchControl::Sysfs(leds) => {
                if enabled {
                    flash::all_on(leds)?;
                } else {
                    flash::all_off(leds);
                }
            }
            TorchControl::LedMode => {
                let handle = self
                    .control_handle
                    .as_ref()
                    .ok_or(BackendError::Unsupported("torch"))?;
                let mode = if enabled {
                    controls::V4L2_FLASH_LED_MODE_TORCH
                } else {
                    controls::V4L2_FLASH_LED_MODE_NONE
                };
                handle.set(controls::V4L2_CID_FLASH_LED_MODE, mode)?;
            }
            TorchControl::None => return Err(BackendError::Unsupported("torch")),
        }

        let torch = if enabled { TorchState::On } else { TorchState::Off };
        self.shared().torch = torch;
        self.send_event(CameraEvent::Torch(torch));
        Ok(())
    }

    fn set_zoom_ratio(&self, ratio: f32) -> BackendResult<()> {
        let range = self.shared().zoom;
        if !ratio.is_finite() || ratio < range.min_zoom_ratio || ratio > range.max_zoom_ratio {
            return Err(BackendError::OutOfRange(format!(
                "zoom ratio {} outside {}..={}",
                ratio, range.min_zoom_ratio, range.max_zoom_ratio
            )));
        }

        if let (Some(info), Some(handle)) = (&self.caps.zoom, &self.control_handle) {
            let value = controls::zoom_value_for_ratio(info, ratio, MAX_DIGITAL_ZOOM);
            handle.set(controls::V4L2_CID_ZOOM_ABSOLUTE, value)?;
        }

        let zoom = {
            let mut shared = self.shared();
            shared.zoom.zoom_ratio = ratio;
            shared.reset_estimator = true;
            shared.zoom
        };
        self.send_event(CameraEvent::Zoom(zoom));
        Ok(())
    }

    fn start_focus_and_metering(&self, action: FocusMeteringAction) -> BackendResult<()> {
        let handle = self
            .control_handle
            .as_ref()
            .ok_or(BackendError::Unsupported("focus and metering"))?;

        let mut handled = false;
        if (action.flags.ae || action.flags.awb) && self.caps.metering {
            handle.set(
                controls::V4L2_CID_EXPOSURE_METERING,
                controls::V4L2_EXPOSURE_METERING_SPOT,
            )?;
            handled = true;
        }
        if action.flags.af {
            if self.caps.focus_start {
                if self.caps.focus_auto {
                    handle.set(controls::V4L2_CID_FOCUS_AUTO, 0)?;
                }
                handle.set(controls::V4L2_CID_AUTO_FOCUS_START, 1)?;
                handled = true;
            } else if self.caps.focus_auto {
                // Firmware-driven AF; only convergence tracking changes
                handled = true;
            }
        }
        if !handled {
            return Err(BackendError::Unsupported("focus and metering"));
        }

        let generation = {
            let mut shared = self.shared();
            shared.focus_generation += 1;
            shared.focus_triggered = action.flags.af;
            shared.reset_estimator = true;
            shared.focus_generation
        };
        debug!(
            x = action.point.x,
            y = action.point.y,
            generation,
            "Focus and metering started"
        );

        if let Some(duration) = action.auto_cancel {
            let shared = Arc::clone(&self.shared);
            let path = self.device.path.clone();
            let caps = self.caps.clone();
            let af_mode = self.af_mode;
            let stop_signal = Arc::clone(&self.stop_signal);
            thread::spawn(move || {
                thread::sleep(duration);
                if stop_signal.load(Ordering::SeqCst) {
                    return;
                }
                {
                    let mut shared = lock_shared(&shared);
                    if shared.focus_generation != generation {
                        return;
                    }
                    shared.focus_triggered = false;
                    shared.reset_estimator = true;
                }
                debug!(generation, "Focus lock auto-cancelled");
                Self::restore_continuous_focus(&path, &caps, af_mode);
            });
        }
        Ok(())
    }

    fn unbind(&self) {
        let handle = self
            .capture_thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(handle) = handle else {
            return;
        };

        self.send_event(CameraEvent::State(CameraState::new(CameraStatus::Closing)));
        self.stop_signal.store(true, Ordering::SeqCst);
        let _ = handle.join();

        if self.shared().torch == TorchState::On
            && let Err(e) = self.enable_torch(false)
        {
            warn!(error = %e, "Failed to turn torch off");
        }
        if self.shared().focus_triggered {
            Self::restore_continuous_focus(&self.device.path, &self.caps, self.af_mode);
        }
        self.still.clear();
        self.send_event(CameraEvent::State(CameraState::new(CameraStatus::Closed)));
        info!(device = %self.device.name, "V4L2 stream stopped");
    }
}

impl Drop for V4l2Session {
    fn drop(&mut self) {
        self.unbind();
    }
}

struct CaptureLoop {
    path: String,
    format: CameraFormat,
    hardware_zoom: bool,
    focus_status: bool,
    lens_position: bool,
    preview: bool,
    shared: Arc<Mutex<SharedControls>>,
    still: StillSource,
    channels: SessionChannels,
    stop_signal: Arc<AtomicBool>,
}

impl CaptureLoop {
    fn run(mut self, setup: std::sync::mpsc::Sender<Result<CameraFormat, CameraStateError>>) {
        let dev = match Device::with_path(&self.path) {
            Ok(dev) => dev,
            Err(e) => {
                let _ = setup.send(Err(CameraStateError::from_io_error(&e)));
                return;
            }
        };

        let mut fourcc_bytes = [b' '; 4];
        for (slot, byte) in fourcc_bytes.iter_mut().zip(self.format.pixel_format.bytes()) {
            *slot = byte;
        }
        let requested = Format::new(self.format.width, self.format.height, FourCC::new(&fourcc_bytes));
        let actual = match dev.set_format(&requested) {
            Ok(actual) => actual,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Failed to set format");
                let _ = setup.send(Err(CameraStateError::from_io_error(&e)));
                return;
            }
        };
        if actual.fourcc != requested.fourcc {
            warn!(
                requested = %self.format.pixel_format,
                actual = %fourcc_string(&actual.fourcc),
                "Driver substituted pixel format"
            );
            let _ = setup.send(Err(CameraStateError::StreamConfig));
            return;
        }

        let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, 4) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Failed to create capture stream");
                let _ = setup.send(Err(CameraStateError::from_io_error(&e)));
                return;
            }
        };

        let fourcc = fourcc_string(&actual.fourcc);
        let actual_format = CameraFormat {
            width: actual.width,
            height: actual.height,
            framerate: self.format.framerate,
            pixel_format: fourcc.clone(),
        };
        if setup.send(Ok(actual_format)).is_err() {
            return;
        }

        let controls = if self.focus_status || self.lens_position {
            ControlHandle::open(&self.path).ok()
        } else {
            None
        };
        let mut tracker = ConvergenceTracker::new();
        let mut failures = 0u32;

        info!(path = %self.path, "Capture loop started");

        while !self.stop_signal.load(Ordering::SeqCst) {
            let (buf, meta) = match stream.next() {
                Ok(frame) => {
                    failures = 0;
                    frame
                }
                Err(e) => {
                    let state_error = CameraStateError::from_io_error(&e);
                    failures += 1;
                    if state_error == CameraStateError::Fatal || failures >= MAX_CAPTURE_FAILURES {
                        error!(path = %self.path, error = %e, "Camera stream lost");
                        self.channels
                            .send_event(CameraEvent::State(CameraState::with_error(
                                CameraStatus::Closed,
                                state_error,
                            )));
                        break;
                    }
                    warn!(error = %e, "Failed to capture frame");
                    continue;
                }
            };

            let used = match meta.bytesused as usize {
                0 => buf.len(),
                n => n.min(buf.len()),
            };
            let Some((data, format, stride)) =
                decode_frame(&buf[..used], &fourcc, actual.width, actual.height, actual.stride)
            else {
                continue;
            };

            let (zoom_ratio, triggered) = {
                let mut shared = lock_shared(&self.shared);
                if shared.reset_estimator {
                    shared.reset_estimator = false;
                    tracker.reset();
                }
                (shared.zoom.zoom_ratio, shared.focus_triggered)
            };

            let mut frame = CameraFrame {
                width: actual.width,
                height: actual.height,
                data,
                format,
                stride,
                sequence: meta.sequence as u64,
                captured_at: Instant::now(),
                digital_zoom: if self.hardware_zoom { 1.0 } else { zoom_ratio },
                result: CaptureResult::default(),
            };

            let hardware = HardwareFocus {
                status: controls
                    .as_ref()
                    .filter(|_| self.focus_status)
                    .and_then(|c| c.get(controls::V4L2_CID_AUTO_FOCUS_STATUS))
                    .map(FocusStatus::from_bits),
                lens_position: controls
                    .as_ref()
                    .filter(|_| self.lens_position)
                    .and_then(|c| c.get(controls::V4L2_CID_FOCUS_ABSOLUTE)),
                triggered,
            };
            frame.result = tracker.update(frame_stats(&frame, STATS_GRID), hardware);

            self.still.publish(frame.clone());

            if self.preview
                && let Err(e) = self.channels.frames.try_send(frame)
                && e.is_disconnected()
            {
                debug!("Preview receiver gone, stopping capture");
                break;
            }
        }

        info!(path = %self.path, "Capture loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_yuyv_passthrough() {
        let buf = vec![16u8; 4 * 2 * 2 + 8];
        let (data, format, stride) = decode_frame(&buf, "YUYV", 4, 2, 8).unwrap();
        assert_eq!(format, PixelFormat::YUYV);
        assert_eq!(stride, 8);
        assert_eq!(data.len(), 16);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        assert!(decode_frame(&[0u8; 10], "YUYV", 4, 2, 8).is_none());
        assert!(decode_frame(&[0u8; 64], "NV12", 4, 2, 4).is_none());
    }

    #[test]
    fn test_decode_zero_stride_uses_packed_width() {
        let buf = vec![0u8; 4 * 3 * 2];
        let (_, format, stride) = decode_frame(&buf, "RGB3", 4, 2, 0).unwrap();
        assert_eq!(format, PixelFormat::RGB24);
        assert_eq!(stride, 12);
    }

    #[test]
    fn test_decode_mjpg() {
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 40, 40]));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 90)
            .encode_image(&img)
            .unwrap();

        let (data, format, stride) = decode_frame(&jpeg, "MJPG", 8, 4, 0).unwrap();
        assert_eq!(format, PixelFormat::RGB24);
        assert_eq!(stride, 24);
        assert_eq!(data.len(), 8 * 4 * 3);

        // Wrong advertised size
        assert!(decode_frame(&jpeg, "MJPG", 16, 4, 0).is_none());
        assert!(decode_frame(&[0xFF, 0xD8, 0x00], "MJPG", 8, 4, 0).is_none());
    }

    #[test]
    fn test_prefer_uncompressed_is_stable() {
        let format = |fourcc: &str, width| CameraFormat {
            width,
            height: 480,
            framerate: None,
            pixel_format: fourcc.to_string(),
        };
        let mut formats = vec![format("MJPG", 640), format("YUYV", 640), format("MJPG", 320)];
        prefer_uncompressed(&mut formats);
        let order: Vec<&str> = formats.iter().map(|f| f.pixel_format.as_str()).collect();
        assert_eq!(order, vec!["MJPG", "MJPG", "YUYV"]);
    }
}
