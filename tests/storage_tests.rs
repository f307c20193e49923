// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for photo storage and aspect ratio selection

use std::time::Duration;
use viewfinder::app::aspect_ratio::{AspectRatio, aspect_ratio};
use viewfinder::constants::{FILENAME_FORMAT, PHOTO_EXTENSION};
use viewfinder::storage::{self, PhotoList};

fn temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("viewfinder-storage-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_listing_is_most_recent_first() {
    let dir = temp_dir();
    let mut created = Vec::new();
    for _ in 0..3 {
        let path = storage::create_file(&dir, FILENAME_FORMAT, PHOTO_EXTENSION);
        std::fs::write(&path, b"jpeg").unwrap();
        created.push(path);
        std::thread::sleep(Duration::from_millis(5));
    }
    std::fs::write(dir.join("notes.txt"), b"skip").unwrap();

    let listed = storage::list_photos(&dir);
    created.reverse();
    assert_eq!(listed, created);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_photo_list_counts() {
    let mut photos = PhotoList::new();
    assert!(photos.is_empty());
    assert_eq!(photos.push("a.jpg".into()), 1);
    assert_eq!(photos.push("b.jpg".into()), 2);
    assert_eq!(photos.len(), 2);
}

#[test]
fn test_aspect_ratio_selection() {
    assert_eq!(aspect_ratio(1080, 1920), AspectRatio::Ratio16_9);
    assert_eq!(aspect_ratio(1920, 1080), AspectRatio::Ratio16_9);
    assert_eq!(aspect_ratio(640, 480), AspectRatio::Ratio4_3);
    assert_eq!(aspect_ratio(1000, 1000), AspectRatio::Ratio4_3);
}
