// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking a photo once the camera has settled

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::warn;
use viewfinder::app::readiness::capture_ready;
use viewfinder::backends::camera::CameraBackendManager;
use viewfinder::backends::camera::types::{
    AfMode, BindRequest, CameraEvent, CameraFrame, SessionChannels, UseCase,
};
use viewfinder::config::Config;
use viewfinder::constants::{
    CLI_READY_TIMEOUT, FILENAME_FORMAT, FRAME_CHANNEL_CAPACITY, PHOTO_EXTENSION,
};
use viewfinder::pipelines::photo::{CaptureExecutor, ImageCapture, OutputFileOptions};
use viewfinder::storage;

/// List all available cameras
pub fn list_cameras(backend: &CameraBackendManager) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = backend.enumerate_cameras().unwrap_or_default();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let facing = camera
            .facing
            .map(|facing| facing.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  [{}] {} ({}, {})", index, camera.name, facing, camera.path);

        let formats = backend.get_formats(camera);
        if !formats.is_empty() {
            // Group formats by resolution and show best framerate
            let mut resolutions: Vec<(u32, u32, u32)> = Vec::new();
            for format in &formats {
                let fps = format.framerate.map(|f| f.as_int()).unwrap_or(30);
                if let Some(existing) = resolutions
                    .iter_mut()
                    .find(|(w, h, _)| *w == format.width && *h == format.height)
                {
                    if fps > existing.2 {
                        existing.2 = fps;
                    }
                } else {
                    resolutions.push((format.width, format.height, fps));
                }
            }

            // Sort by resolution (highest first)
            resolutions.sort_by(|a, b| (b.0 * b.1).cmp(&(a.0 * a.1)));

            let res_strs: Vec<String> = resolutions
                .iter()
                .take(4)
                .map(|(w, h, fps)| {
                    let ratio = viewfinder::app::aspect_ratio::aspect_ratio(*w, *h);
                    format!("{}x{}@{}fps ({})", w, h, fps, ratio)
                })
                .collect();

            println!("      Formats: {}", res_strs.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Take a photo using the specified camera
pub fn take_photo(
    backend: &CameraBackendManager,
    config: &Config,
    camera_index: usize,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = backend.enumerate_cameras()?;
    if cameras.is_empty() {
        return Err("No cameras found".into());
    }
    if camera_index >= cameras.len() {
        return Err(format!(
            "Camera index {} out of range (0-{})",
            camera_index,
            cameras.len() - 1
        )
        .into());
    }

    let camera = &cameras[camera_index];
    println!("Using camera: {}", camera.name);

    // Determine output directory
    let output_dir = match output.as_ref() {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
        None => storage::get_output_directory(&config.app_name),
    };
    std::fs::create_dir_all(&output_dir)?;

    let request = BindRequest {
        lens_facing: camera.facing.unwrap_or(config.lens_facing),
        device_path: Some(camera.path.clone()),
        aspect_ratio: Default::default(),
        use_cases: vec![UseCase::Preview, UseCase::ImageCapture],
        max_pixels: config.max_capture_pixels,
        af_mode: AfMode::ContinuousPicture,
    };
    let (channels, mut frames, mut events) = SessionChannels::new(FRAME_CHANNEL_CAPACITY);
    let session = backend.bind(&request, channels)?;
    println!("Capture format: {}", session.camera_info().format);

    // Wait for focus and white balance to settle
    println!("Waiting for the camera to settle...");
    let start = Instant::now();
    let mut last_frame: Option<CameraFrame> = None;
    let mut ready = false;
    while start.elapsed() < CLI_READY_TIMEOUT {
        while let Ok(event) = events.try_recv() {
            if let CameraEvent::State(state) = event
                && let Some(error) = state.error
            {
                session.unbind();
                return Err(error.message().into());
            }
        }
        match frames.try_recv() {
            Ok(frame) => {
                ready = capture_ready(&frame.result);
                last_frame = Some(frame);
                if ready {
                    break;
                }
            }
            Err(_) => std::thread::sleep(Duration::from_millis(16)),
        }
    }
    if last_frame.is_none() {
        session.unbind();
        return Err("Failed to capture frame from camera".into());
    }
    if !ready {
        warn!(result = ?last_frame.map(|f| f.result), "Camera did not settle in time");
        println!("Camera did not settle; capturing anyway");
    }

    // Capture on the executor, as the camera screen does
    let executor = CaptureExecutor::new()?;
    let capture = ImageCapture::new(session.still_source(), executor.clone(), config.photo_quality);
    let file = storage::create_file(&output_dir, FILENAME_FORMAT, PHOTO_EXTENSION);
    let (sender, receiver) = mpsc::channel();
    capture.take_picture(OutputFileOptions::new(file), move |result| {
        let _ = sender.send(result);
    });
    let result = receiver.recv();
    executor.shutdown();
    session.unbind();

    let saved = result.map_err(|_| "Capture executor stopped")??;
    let output_path = saved.saved_uri;

    // If user specified a specific filename, rename the file
    if let Some(user_path) = output
        && !user_path.is_dir()
    {
        std::fs::rename(&output_path, &user_path)?;
        println!("Photo saved: {}", user_path.display());
        return Ok(());
    }

    println!("Photo saved: {}", output_path.display());
    Ok(())
}
