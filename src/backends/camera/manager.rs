// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend handle shared between the UI and worker threads
//!
//! The manager provides:
//! - A cheaply clonable, thread-safe backend handle
//! - Enumeration with "no camera" reported as an error
//! - Logging around bind

use super::types::*;
use super::{CameraBackend, CameraSession, get_backend};
use std::sync::Arc;
use tracing::{info, warn};

/// Camera backend manager
///
/// Clones share one backend, so a bind can run on a blocking worker while the
/// UI keeps its own handle.
#[derive(Clone)]
pub struct CameraBackendManager {
    backend: Arc<dyn CameraBackend>,
}

impl CameraBackendManager {
    /// Create a manager for the given backend type
    pub fn new(backend_type: CameraBackendType) -> Self {
        info!(backend = %backend_type, "Creating camera backend manager");
        Self {
            backend: get_backend(backend_type),
        }
    }

    /// Wrap an existing backend instance
    pub fn with_backend(backend: Arc<dyn CameraBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_type(&self) -> CameraBackendType {
        self.backend.backend_type()
    }

    pub fn has_permission(&self) -> bool {
        self.backend.has_permission()
    }

    /// Enumerate available cameras
    pub fn enumerate_cameras(&self) -> BackendResult<Vec<CameraDevice>> {
        let cameras = self.backend.enumerate_cameras();
        if cameras.is_empty() {
            Err(BackendError::DeviceNotFound("No cameras found".to_string()))
        } else {
            Ok(cameras)
        }
    }

    /// Get supported formats for a camera
    pub fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat> {
        self.backend.get_formats(device)
    }

    /// Bind use cases to a camera. Blocking; opening a device can take a
    /// noticeable fraction of a second.
    pub fn bind(
        &self,
        request: &BindRequest,
        channels: SessionChannels,
    ) -> BackendResult<Box<dyn CameraSession>> {
        info!(
            facing = %request.lens_facing,
            aspect = %request.aspect_ratio,
            use_cases = ?request.use_cases,
            "Binding camera use cases"
        );
        match self.backend.bind(request, channels) {
            Ok(session) => {
                let info = session.camera_info();
                info!(
                    device = %info.device.name,
                    format = %info.format,
                    flash = info.has_flash_unit,
                    "Camera bound"
                );
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Use case binding failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for CameraBackendManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraBackendManager")
            .field("backend", &self.backend.backend_type())
            .finish()
    }
}
