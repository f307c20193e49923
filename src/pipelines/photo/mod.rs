// SPDX-License-Identifier: MPL-2.0

//! Still capture use case
//!
//! ```text
//! UI thread ──take_picture──▶ CaptureExecutor thread
//!                                 │  latest still frame
//!                                 │  → RGB (digital zoom applied)
//!                                 │  → JPEG → file
//!                                 ▼
//!                             callback(Result)
//! ```
//!
//! The preview keeps streaming while a capture is encoded. Jobs run one at a
//! time in submission order, and every callback is invoked exactly once, even
//! when the executor is shutting down.

pub mod encoding;

pub use encoding::{EncodingQuality, PhotoEncoder};

use crate::backends::camera::types::StillSource;
use crate::errors::PhotoError;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a capture should be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileOptions {
    pub file: PathBuf,
}

impl OutputFileOptions {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

/// Outcome of a successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileResults {
    pub saved_uri: PathBuf,
}

/// Why a capture produced no file
#[derive(Debug, Clone, PartialEq)]
pub enum ImageCaptureError {
    /// No frame has been streamed yet
    NoFrame,
    /// The frame could not be converted or encoded
    Encoding(String),
    /// The file could not be written
    FileIo(String),
    /// The capture executor was shut down before the capture ran
    Cancelled,
}

impl std::fmt::Display for ImageCaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageCaptureError::NoFrame => write!(f, "Photo capture failed: no frame available"),
            ImageCaptureError::Encoding(msg) => write!(f, "Photo capture failed: {}", msg),
            ImageCaptureError::FileIo(msg) => write!(f, "Photo capture failed: {}", msg),
            ImageCaptureError::Cancelled => write!(f, "Photo capture cancelled"),
        }
    }
}

impl std::error::Error for ImageCaptureError {}

impl From<PhotoError> for ImageCaptureError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::NoFrameAvailable => ImageCaptureError::NoFrame,
            PhotoError::EncodingFailed(msg) => ImageCaptureError::Encoding(msg),
            PhotoError::SaveFailed(msg) => ImageCaptureError::FileIo(msg),
        }
    }
}

struct ExecutorInner {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Single worker thread running capture jobs in order
///
/// Clones share the same worker.
#[derive(Clone)]
pub struct CaptureExecutor {
    inner: Arc<ExecutorInner>,
}

impl CaptureExecutor {
    pub fn new() -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let worker = std::thread::Builder::new()
            .name("capture-executor".to_string())
            .spawn(move || {
                debug!("Capture executor started");
                while let Some(job) = receiver.blocking_recv() {
                    job();
                }
                debug!("Capture executor stopped");
            })?;

        Ok(Self {
            inner: Arc::new(ExecutorInner {
                sender: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Queue a job. Hands the job back when the executor has shut down.
    fn execute(&self, job: Job) -> Result<(), Job> {
        let sender = self.inner.sender.lock().unwrap_or_else(|e| e.into_inner());
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Stop accepting jobs, run the ones already queued and join the worker.
    /// Idempotent.
    pub fn shutdown(&self) {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(sender);

        let worker = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("Capture executor panicked");
            } else {
                info!("Capture executor shut down");
            }
        }
    }
}

impl std::fmt::Debug for CaptureExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureExecutor")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Image-capture use case bound to a camera session
#[derive(Debug, Clone)]
pub struct ImageCapture {
    still: StillSource,
    executor: CaptureExecutor,
    encoder: PhotoEncoder,
}

impl ImageCapture {
    pub fn new(still: StillSource, executor: CaptureExecutor, quality: EncodingQuality) -> Self {
        Self {
            still,
            executor,
            encoder: PhotoEncoder::new(quality),
        }
    }

    /// Capture the latest frame into `options.file`.
    ///
    /// Returns immediately; `callback` runs on the capture executor thread (or
    /// inline when the executor is gone).
    pub fn take_picture<F>(&self, options: OutputFileOptions, callback: F)
    where
        F: FnOnce(Result<OutputFileResults, ImageCaptureError>) + Send + 'static,
    {
        let still = self.still.clone();
        let encoder = self.encoder;
        let callback = Arc::new(Mutex::new(Some(callback)));
        let job_callback = Arc::clone(&callback);

        let job: Job = Box::new(move || {
            let result = capture_to_file(&still, &encoder, options);
            let callback = job_callback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            if let Some(callback) = callback {
                callback(result);
            }
        });

        if self.executor.execute(job).is_err() {
            warn!("Capture requested after executor shutdown");
            let callback = callback.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(callback) = callback {
                callback(Err(ImageCaptureError::Cancelled));
            }
        }
    }
}

fn capture_to_file(
    still: &StillSource,
    encoder: &PhotoEncoder,
    options: OutputFileOptions,
) -> Result<OutputFileResults, ImageCaptureError> {
    let frame = still.latest().ok_or(PhotoError::NoFrameAvailable)?;
    debug!(
        sequence = frame.sequence,
        width = frame.width,
        height = frame.height,
        zoom = frame.digital_zoom,
        "Capturing still frame"
    );
    encoder.save_frame(&frame, &options.file)?;
    Ok(OutputFileResults {
        saved_uri: options.file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::{CameraFrame, CaptureResult, PixelFormat};
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    fn rgb_frame(width: u32, height: u32) -> CameraFrame {
        let data: Vec<u8> = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format: PixelFormat::RGB24,
            stride: width * 3,
            sequence: 1,
            captured_at: Instant::now(),
            digital_zoom: 1.0,
            result: CaptureResult::default(),
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("viewfinder-capture-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_jobs_run_in_order() {
        let executor = CaptureExecutor::new().unwrap();
        let (tx, rx) = std_mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            assert!(executor.execute(Box::new(move || tx.send(i).unwrap())).is_ok());
        }
        executor.shutdown();
        let order: Vec<i32> = rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_take_picture_without_frame_fails() {
        let executor = CaptureExecutor::new().unwrap();
        let capture = ImageCapture::new(StillSource::new(), executor.clone(), EncodingQuality::Low);
        let (tx, rx) = std_mpsc::channel();
        capture.take_picture(OutputFileOptions::new(temp_dir().join("x.jpg")), move |r| {
            tx.send(r).unwrap();
        });
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, Err(ImageCaptureError::NoFrame));
        executor.shutdown();
    }

    #[test]
    fn test_take_picture_writes_jpeg() {
        let dir = temp_dir();
        let still = StillSource::new();
        still.publish(rgb_frame(64, 48));
        let executor = CaptureExecutor::new().unwrap();
        let capture = ImageCapture::new(still, executor.clone(), EncodingQuality::High);

        let (tx, rx) = std_mpsc::channel();
        let file = dir.join("2024-01-01-00-00-00-000.jpg");
        capture.take_picture(OutputFileOptions::new(&file), move |r| {
            tx.send(r).unwrap();
        });
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(result.saved_uri, file);
        let decoded = image::open(&file).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));

        executor.shutdown();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_callback_runs_once_after_shutdown() {
        let executor = CaptureExecutor::new().unwrap();
        executor.shutdown();
        executor.shutdown();
        assert!(executor.is_shut_down());

        let capture = ImageCapture::new(StillSource::new(), executor, EncodingQuality::High);
        let (tx, rx) = std_mpsc::channel();
        capture.take_picture(OutputFileOptions::new("/nonexistent/a.jpg"), move |r| {
            tx.send(r).unwrap();
        });
        assert_eq!(rx.try_recv().unwrap(), Err(ImageCaptureError::Cancelled));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unwritable_path_is_file_error() {
        let still = StillSource::new();
        still.publish(rgb_frame(16, 12));
        let executor = CaptureExecutor::new().unwrap();
        let capture = ImageCapture::new(still, executor.clone(), EncodingQuality::High);
        let (tx, rx) = std_mpsc::channel();
        let file = temp_dir().join("missing-subdir").join("a.jpg");
        capture.take_picture(OutputFileOptions::new(file), move |r| {
            tx.send(r).unwrap();
        });
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(ImageCaptureError::FileIo(_))));
        executor.shutdown();
    }
}
