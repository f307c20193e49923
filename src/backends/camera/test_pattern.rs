// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Streams scrolling color bars and simulates the 3A loops of a phone camera:
//! white balance and exposure search for a few frames after the stream starts,
//! continuous AF scans before settling, and a tap-to-focus runs a short active
//! scan and holds focus until its auto-cancel expires. Torch, zoom and
//! camera-state errors behave like a real device, so the whole screen can run
//! without hardware.

use super::types::*;
use super::{CameraBackend, CameraSession, select_camera, select_format};
use crate::constants::MAX_DIGITAL_ZOOM;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Frames of AWB search after the stream starts
pub const AWB_SEARCH_FRAMES: u64 = 10;
/// Frames of AE search after the stream starts
pub const AE_SEARCH_FRAMES: u64 = 6;
/// Frames continuous AF scans after start, zoom, or a released focus lock
pub const AF_SCAN_FRAMES: u64 = 15;
/// Frames a triggered focus scan takes before locking
pub const ACTIVE_SCAN_FRAMES: u64 = 8;

/// Behaviour of the synthetic camera
#[derive(Debug, Clone)]
pub struct TestPatternOptions {
    /// Reported by `has_permission`
    pub permission: bool,
    pub has_flash_unit: bool,
    /// Upper end of the zoom range
    pub max_zoom_ratio: f32,
    /// Delay between frames
    pub frame_interval: Duration,
    /// Fail every bind with this error
    pub bind_error: Option<CameraStateError>,
    /// Report this error and stop after the given number of frames
    pub stream_error: Option<(u64, CameraStateError)>,
    /// Formats offered by both synthetic cameras
    pub formats: Vec<CameraFormat>,
}

impl Default for TestPatternOptions {
    fn default() -> Self {
        let format = |width, height| CameraFormat {
            width,
            height,
            framerate: Some(Framerate::from_int(30)),
            pixel_format: "RGB3".to_string(),
        };
        Self {
            permission: true,
            has_flash_unit: true,
            max_zoom_ratio: MAX_DIGITAL_ZOOM,
            frame_interval: Duration::from_millis(33),
            bind_error: None,
            stream_error: None,
            formats: vec![
                format(640, 480),
                format(1280, 960),
                format(1280, 720),
                format(1920, 1080),
            ],
        }
    }
}

/// Simulated 3A result for one frame.
///
/// `frames_since_start` counts frames since the stream began,
/// `frames_since_af_reset` since continuous AF last restarted, and `trigger`
/// holds the frames since a tap-to-focus began while its lock is active.
pub fn simulate_3a(
    frames_since_start: u64,
    frames_since_af_reset: u64,
    trigger: Option<u64>,
) -> CaptureResult {
    let awb_state = if frames_since_start < AWB_SEARCH_FRAMES {
        AwbState::Searching
    } else {
        AwbState::Converged
    };
    let ae_state = if frames_since_start < AE_SEARCH_FRAMES {
        AeState::Searching
    } else {
        AeState::Converged
    };
    let (af_state, lens_state) = match trigger {
        Some(frames) if frames < ACTIVE_SCAN_FRAMES => (AfState::ActiveScan, LensState::Moving),
        Some(_) => (AfState::FocusedLocked, LensState::Stationary),
        None if frames_since_af_reset < AF_SCAN_FRAMES => {
            (AfState::PassiveScan, LensState::Moving)
        }
        None => (AfState::PassiveFocused, LensState::Stationary),
    };

    CaptureResult {
        af_state: Some(af_state),
        ae_state: Some(ae_state),
        awb_state: Some(awb_state),
        lens_state: Some(lens_state),
    }
}

/// Render one RGB24 frame of scrolling color bars with a gray ramp below
pub fn pattern_frame(width: u32, height: u32, sequence: u64, torch: TorchState) -> Vec<u8> {
    const BARS: [(u8, u8, u8); 8] = [
        (235, 235, 235),
        (235, 235, 16),
        (16, 235, 235),
        (16, 235, 16),
        (235, 16, 235),
        (235, 16, 16),
        (16, 16, 235),
        (16, 16, 16),
    ];

    let width = width.max(1);
    let ramp_start = height - height / 4;
    let offset = ((sequence * 2) % width as u64) as u32;
    let mut data = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = if y < ramp_start {
                BARS[(((x + offset) % width) * 8 / width) as usize]
            } else {
                let v = (x * 255 / width) as u8;
                (v, v, v)
            };
            let (r, g, b) = match torch {
                TorchState::Off => (r, g, b),
                // Torch washes the scene toward white
                TorchState::On => (
                    r.saturating_add((255 - r) / 3),
                    g.saturating_add((255 - g) / 3),
                    b.saturating_add((255 - b) / 3),
                ),
            };
            data.extend_from_slice(&[r, g, b]);
        }
    }
    data
}

/// Synthetic camera provider with a back and a front camera
#[derive(Debug, Clone, Default)]
pub struct TestPatternBackend {
    options: TestPatternOptions,
}

impl TestPatternBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TestPatternOptions) -> Self {
        Self { options }
    }
}

impl CameraBackend for TestPatternBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }

    fn has_permission(&self) -> bool {
        self.options.permission
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        [LensFacing::Back, LensFacing::Front]
            .into_iter()
            .map(|facing| CameraDevice {
                name: format!("Test Pattern ({})", facing),
                path: format!("test-pattern:{}", facing),
                driver: None,
                facing: Some(facing),
            })
            .collect()
    }

    fn get_formats(&self, _device: &CameraDevice) -> Vec<CameraFormat> {
        self.options.formats.clone()
    }

    fn bind(
        &self,
        request: &BindRequest,
        channels: SessionChannels,
    ) -> BackendResult<Box<dyn CameraSession>> {
        if let Some(error) = self.options.bind_error {
            warn!(%error, "Injected bind error");
            return Err(BackendError::Camera(error));
        }
        if !self.options.permission {
            return Err(BackendError::Camera(CameraStateError::CameraDisabled));
        }

        let cameras = self.enumerate_cameras();
        let device = select_camera(&cameras, request)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound("no test pattern camera".to_string()))?;
        let format = select_format(
            &self.options.formats,
            request.aspect_ratio,
            request.max_pixels,
        )
        .ok_or_else(|| BackendError::FormatNotSupported("no test pattern format".to_string()))?;

        let session = TestPatternSession::start(device, format, request, &self.options, channels);
        Ok(Box::new(session))
    }
}

#[derive(Debug)]
struct FocusLock {
    started_at: u64,
    cancel_at: Option<Instant>,
}

#[derive(Debug)]
struct PatternState {
    torch: TorchState,
    zoom: ZoomState,
    /// Sequence at which continuous AF last restarted
    af_reset_at: u64,
    focus: Option<FocusLock>,
    /// Sequence of the next frame
    sequence: u64,
}

/// A running synthetic camera
pub struct TestPatternSession {
    device: CameraDevice,
    format: CameraFormat,
    has_flash_unit: bool,
    state: Arc<Mutex<PatternState>>,
    events: SessionChannels,
    still: StillSource,
    stop_signal: Arc<AtomicBool>,
    capture_thread: Mutex<Option<JoinHandle<()>>>,
}

impl TestPatternSession {
    fn start(
        device: CameraDevice,
        format: CameraFormat,
        request: &BindRequest,
        options: &TestPatternOptions,
        channels: SessionChannels,
    ) -> Self {
        channels.send_event(CameraEvent::State(CameraState::new(CameraStatus::Opening)));

        let state = Arc::new(Mutex::new(PatternState {
            torch: TorchState::Off,
            zoom: ZoomState {
                zoom_ratio: 1.0,
                min_zoom_ratio: 1.0,
                max_zoom_ratio: options.max_zoom_ratio.max(1.0),
            },
            af_reset_at: 0,
            focus: None,
            sequence: 0,
        }));
        let still = StillSource::new();
        let stop_signal = Arc::new(AtomicBool::new(false));

        let capture_thread = if request.wants(UseCase::Preview) || request.wants(UseCase::ImageCapture)
        {
            let loop_ctx = PatternLoop {
                width: format.width,
                height: format.height,
                interval: options.frame_interval,
                stream_error: options.stream_error,
                preview: request.wants(UseCase::Preview),
                af_enabled: request.af_mode == AfMode::ContinuousPicture,
                state: Arc::clone(&state),
                still: still.clone(),
                channels: channels.clone(),
                stop_signal: Arc::clone(&stop_signal),
            };
            Some(thread::spawn(move || loop_ctx.run()))
        } else {
            None
        };

        channels.send_event(CameraEvent::State(CameraState::new(CameraStatus::Open)));
        info!(device = %device.name, format = %format, "Test pattern started");

        Self {
            device,
            format,
            has_flash_unit: options.has_flash_unit,
            state,
            events: channels,
            still,
            stop_signal,
            capture_thread: Mutex::new(capture_thread),
        }
    }

    fn state(&self) -> MutexGuard<'_, PatternState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CameraSession for TestPatternSession {
    fn camera_info(&self) -> CameraInfo {
        let state = self.state();
        CameraInfo {
            device: self.device.clone(),
            format: self.format.clone(),
            has_flash_unit: self.has_flash_unit,
            torch_state: state.torch,
            zoom_state: state.zoom,
        }
    }

    fn still_source(&self) -> StillSource {
        self.still.clone()
    }

    fn enable_torch(&self, enabled: bool) -> BackendResult<()> {
        if !self.has_flash_unit {
            return Err(BackendError::Unsupported("torch"));
        }
        let torch = if enabled { TorchState::On } else { TorchState::Off };
        self.state().torch = torch;
        self.events.send_event(CameraEvent::Torch(torch));
        Ok(())
    }

    fn set_zoom_ratio(&self, ratio: f32) -> BackendResult<()> {
        let zoom = {
            let mut state = self.state();
            let range = state.zoom;
            if !ratio.is_finite() || ratio < range.min_zoom_ratio || ratio > range.max_zoom_ratio
            {
                return Err(BackendError::OutOfRange(format!(
                    "zoom ratio {} outside {}..={}",
                    ratio, range.min_zoom_ratio, range.max_zoom_ratio
                )));
            }
            state.zoom.zoom_ratio = ratio;
            // New framing restarts continuous AF
            state.af_reset_at = state.sequence;
            state.zoom
        };
        self.events.send_event(CameraEvent::Zoom(zoom));
        Ok(())
    }

    fn start_focus_and_metering(&self, action: FocusMeteringAction) -> BackendResult<()> {
        if !action.flags.af {
            debug!(?action, "Metering-only action, nothing to simulate");
            return Ok(());
        }
        let mut state = self.state();
        state.focus = Some(FocusLock {
            started_at: state.sequence,
            cancel_at: action.auto_cancel.map(|d| Instant::now() + d),
        });
        debug!(x = action.point.x, y = action.point.y, "Simulated focus scan started");
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
        self.events
            .send_event(CameraEvent::State(CameraState::new(CameraStatus::Closing)));
        self.stop_signal.store(true, Ordering::SeqCst);
        let _ = handle.join();
        self.still.clear();
        self.events
            .send_event(CameraEvent::State(CameraState::new(CameraStatus::Closed)));
        info!(device = %self.device.name, "Test pattern stopped");
    }
}

impl Drop for TestPatternSession {
    fn drop(&mut self) {
        self.unbind();
    }
}

struct PatternLoop {
    width: u32,
    height: u32,
    interval: Duration,
    stream_error: Option<(u64, CameraStateError)>,
    preview: bool,
    af_enabled: bool,
    state: Arc<Mutex<PatternState>>,
    still: StillSource,
    channels: SessionChannels,
    stop_signal: Arc<AtomicBool>,
}

impl PatternLoop {
    fn run(mut self) {
        while !self.stop_signal.load(Ordering::SeqCst) {
            thread::sleep(self.interval);

            let (sequence, result, torch, zoom) = {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                let sequence = state.sequence;
                state.sequence += 1;

                if let Some(lock) = &state.focus
                    && lock.cancel_at.is_some_and(|at| Instant::now() >= at)
                {
                    debug!(sequence, "Focus lock auto-cancelled");
                    state.focus = None;
                    state.af_reset_at = sequence;
                }

                let trigger = state
                    .focus
                    .as_ref()
                    .map(|lock| sequence - lock.started_at);
                let mut result = simulate_3a(sequence, sequence - state.af_reset_at, trigger);
                if !self.af_enabled && trigger.is_none() {
                    result.af_state = Some(AfState::Inactive);
                    result.lens_state = Some(LensState::Stationary);
                }
                (sequence, result, state.torch, state.zoom.zoom_ratio)
            };

            if let Some((at, error)) = self.stream_error
                && sequence >= at
            {
                warn!(%error, sequence, "Injected stream error");
                self.channels
                    .send_event(CameraEvent::State(CameraState::with_error(
                        CameraStatus::Closed,
                        error,
                    )));
                break;
            }

            let frame = CameraFrame {
                width: self.width,
                height: self.height,
                data: Arc::from(pattern_frame(self.width, self.height, sequence, torch)),
                format: PixelFormat::RGB24,
                stride: self.width * 3,
                sequence,
                captured_at: Instant::now(),
                digital_zoom: zoom,
                result,
            };
            self.still.publish(frame.clone());

            if self.preview
                && let Err(e) = self.channels.frames.try_send(frame)
                && e.is_disconnected()
            {
                debug!("Preview receiver gone, stopping test pattern");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::readiness::capture_ready;
    use futures::StreamExt;

    fn request() -> BindRequest {
        BindRequest {
            lens_facing: LensFacing::Back,
            device_path: None,
            aspect_ratio: AspectRatio::Ratio4_3,
            use_cases: vec![UseCase::Preview, UseCase::ImageCapture],
            max_pixels: 64 * 48,
            af_mode: AfMode::ContinuousPicture,
        }
    }

    fn small_options() -> TestPatternOptions {
        TestPatternOptions {
            frame_interval: Duration::from_millis(1),
            formats: vec![CameraFormat {
                width: 64,
                height: 48,
                framerate: Some(Framerate::from_int(30)),
                pixel_format: "RGB3".to_string(),
            }],
            ..TestPatternOptions::default()
        }
    }

    #[test]
    fn test_simulated_convergence_timeline() {
        let first_ready = (0..100)
            .find(|&n| capture_ready(&simulate_3a(n, n, None)))
            .unwrap();
        assert_eq!(first_ready, AF_SCAN_FRAMES.max(AWB_SEARCH_FRAMES));
        assert_eq!(
            simulate_3a(0, 0, None).lens_state,
            Some(LensState::Moving)
        );
        assert_eq!(
            simulate_3a(AE_SEARCH_FRAMES, 0, None).ae_state,
            Some(AeState::Converged)
        );
    }

    #[test]
    fn test_simulated_focus_lock_blocks_readiness() {
        for frames in 0..20 {
            let result = simulate_3a(100, 100, Some(frames));
            assert!(!capture_ready(&result));
            let expected = if frames < ACTIVE_SCAN_FRAMES {
                AfState::ActiveScan
            } else {
                AfState::FocusedLocked
            };
            assert_eq!(result.af_state, Some(expected));
        }
    }

    #[test]
    fn test_pattern_frame_size_and_torch() {
        let off = pattern_frame(16, 8, 0, TorchState::Off);
        let on = pattern_frame(16, 8, 0, TorchState::On);
        assert_eq!(off.len(), 16 * 8 * 3);
        let sum = |d: &[u8]| d.iter().map(|&v| v as u64).sum::<u64>();
        assert!(sum(&on) > sum(&off));
    }

    #[test]
    fn test_enumerates_back_and_front() {
        let cameras = TestPatternBackend::new().enumerate_cameras();
        let facings: Vec<_> = cameras.iter().map(|c| c.facing).collect();
        assert_eq!(facings, vec![Some(LensFacing::Back), Some(LensFacing::Front)]);
    }

    #[test]
    fn test_bind_streams_until_ready() {
        let backend = TestPatternBackend::with_options(small_options());
        let (channels, mut frames, _events) = SessionChannels::new(64);
        let session = backend.bind(&request(), channels).unwrap();

        let ready = futures::executor::block_on(async {
            for _ in 0..200 {
                match frames.next().await {
                    Some(frame) if capture_ready(&frame.result) => return true,
                    Some(_) => {}
                    None => return false,
                }
            }
            false
        });
        assert!(ready);
        assert!(session.still_source().latest().is_some());

        session.unbind();
        assert!(session.still_source().latest().is_none());
    }

    #[test]
    fn test_controls_report_events() {
        let backend = TestPatternBackend::with_options(small_options());
        let (channels, _frames, mut events) = SessionChannels::new(4);
        let session = backend.bind(&request(), channels).unwrap();

        session.enable_torch(true).unwrap();
        session.set_zoom_ratio(2.0).unwrap();
        assert!(matches!(
            session.set_zoom_ratio(MAX_DIGITAL_ZOOM + 1.0),
            Err(BackendError::OutOfRange(_))
        ));
        assert_eq!(session.camera_info().torch_state, TorchState::On);
        assert_eq!(session.camera_info().zoom_state.zoom_ratio, 2.0);
        session.unbind();

        let received: Vec<CameraEvent> = futures::executor::block_on(async {
            let mut all = Vec::new();
            while let Ok(Some(event)) = events.try_next() {
                all.push(event);
            }
            all
        });
        assert!(received.iter().any(|e| matches!(e, CameraEvent::Torch(TorchState::On))));
        assert!(received
            .iter()
            .any(|e| matches!(e, CameraEvent::Zoom(z) if z.zoom_ratio == 2.0)));
        assert!(received.iter().any(|e| matches!(
            e,
            CameraEvent::State(CameraState { status: CameraStatus::Closed, error: None })
        )));
    }

    #[test]
    fn test_injected_errors() {
        let backend = TestPatternBackend::with_options(TestPatternOptions {
            bind_error: Some(CameraStateError::CameraInUse),
            ..small_options()
        });
        let (channels, _frames, _events) = SessionChannels::new(4);
        assert_eq!(
            backend.bind(&request(), channels).err(),
            Some(BackendError::Camera(CameraStateError::CameraInUse))
        );

        let backend = TestPatternBackend::with_options(TestPatternOptions {
            stream_error: Some((3, CameraStateError::Fatal)),
            ..small_options()
        });
        let (channels, mut frames, mut events) = SessionChannels::new(16);
        let _session = backend.bind(&request(), channels).unwrap();
        let error = futures::executor::block_on(async {
            while let Some(event) = events.next().await {
                if let CameraEvent::State(state) = event
                    && state.error.is_some()
                {
                    return state.error;
                }
            }
            None
        });
        assert_eq!(error, Some(CameraStateError::Fatal));
        let streamed = futures::executor::block_on(async {
            let mut count = 0;
            while let Ok(Some(_)) = frames.try_next() {
                count += 1;
            }
            count
        });
        assert_eq!(streamed, 3);
    }

    #[test]
    fn test_torch_without_flash_unit() {
        let backend = TestPatternBackend::with_options(TestPatternOptions {
            has_flash_unit: false,
            ..small_options()
        });
        let (channels, _frames, _events) = SessionChannels::new(4);
        let session = backend.bind(&request(), channels).unwrap();
        assert!(!session.camera_info().has_flash_unit);
        assert_eq!(
            session.enable_torch(true),
            Err(BackendError::Unsupported("torch"))
        );
    }
}
