// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for captured photos
//!
//! Photos are named by capture time so that a lexicographic sort of a capture
//! directory is a chronological sort.

use crate::constants::{FILENAME_FORMAT, PHOTO_EXTENSION};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolve (and create) the directory photos are written to.
///
/// Prefers `<Pictures>/<app_name>`; falls back to the application data
/// directory when the pictures directory is unavailable or not writable.
pub fn get_output_directory(app_name: &str) -> PathBuf {
    let media_dir = dirs::picture_dir().map(|dir| dir.join(app_name));
    if let Some(dir) = media_dir {
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                info!(path = %dir.display(), "Photo directory ready");
                return dir;
            }
            Err(e) => warn!(path = %dir.display(), error = %e, "Cannot create photo directory"),
        }
    }

    let files_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name.to_lowercase());
    if let Err(e) = std::fs::create_dir_all(&files_dir) {
        warn!(path = %files_dir.display(), error = %e, "Cannot create fallback photo directory");
    }
    info!(path = %files_dir.display(), "Using fallback photo directory");
    files_dir
}

/// File name for a photo taken at `time`
pub fn photo_file_name(time: DateTime<Local>) -> String {
    format!("{}{}", time.format(FILENAME_FORMAT), PHOTO_EXTENSION)
}

/// `<base>/<formatted now><extension>`
pub fn create_file(base_folder: &Path, format: &str, extension: &str) -> PathBuf {
    create_file_at(base_folder, format, extension, Local::now())
}

pub fn create_file_at(
    base_folder: &Path,
    format: &str,
    extension: &str,
    time: DateTime<Local>,
) -> PathBuf {
    base_folder.join(format!("{}{}", time.format(format), extension))
}

/// List JPEG photos in `dir`, most recent first.
///
/// Names carry the capture timestamp, so descending name order is
/// descending capture order. A missing directory lists as empty.
pub fn list_photos(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "Cannot read photo directory");
            return Vec::new();
        }
    };

    let mut photos: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_jpeg(path))
        .collect();

    photos.sort_by(|a, b| b.cmp(a));
    photos
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("jpg"))
        .unwrap_or(false)
}

/// Photos captured while the screen is open, in capture order
#[derive(Debug, Clone, Default)]
pub struct PhotoList {
    photos: Vec<PathBuf>,
}

impl PhotoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a saved photo; returns the new count
    pub fn push(&mut self, uri: PathBuf) -> usize {
        self.photos.push(uri);
        self.photos.len()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.photos
    }
}

/// Downscaled RGB image for the gallery grid
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Packed RGB24 pixels
    pub rgb: Arc<[u8]>,
}

/// Decode `path` and fit it inside `max_width` x `max_height` pixels.
///
/// Blocking; callers run it off the UI thread.
pub fn load_thumbnail(path: &Path, max_width: u32, max_height: u32) -> Option<Thumbnail> {
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to decode photo");
            return None;
        }
    };
    let rgb = img.thumbnail(max_width.max(1), max_height.max(1)).to_rgb8();
    let (width, height) = rgb.dimensions();
    debug!(path = %path.display(), width, height, "Thumbnail loaded");
    Some(Thumbnail {
        width,
        height,
        rgb: Arc::from(rgb.into_raw()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_photo_file_name_format() {
        let time = Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(photo_file_name(time), "2024-03-09-07-05-01-042.jpg");
    }

    #[test]
    fn test_names_sort_by_time() {
        let base = Local
            .with_ymd_and_hms(2023, 12, 31, 23, 59, 59)
            .single()
            .unwrap();
        let times = [
            base,
            base + chrono::Duration::milliseconds(1),
            base + chrono::Duration::milliseconds(999),
            base + chrono::Duration::seconds(1),
            base + chrono::Duration::days(40),
        ];
        let names: Vec<String> = times.iter().map(|t| photo_file_name(*t)).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_photo_list_counts() {
        let mut list = PhotoList::new();
        assert!(list.is_empty());
        assert_eq!(list.push(PathBuf::from("a.jpg")), 1);
        assert_eq!(list.push(PathBuf::from("b.jpg")), 2);
        assert_eq!(list.as_slice()[0], PathBuf::from("a.jpg"));
    }

    #[test]
    fn test_list_photos_missing_dir() {
        let dir = std::env::temp_dir().join("viewfinder-does-not-exist-7f3a");
        assert!(list_photos(&dir).is_empty());
    }
}
