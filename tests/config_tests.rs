// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use viewfinder::Config;
use viewfinder::backends::camera::types::{CameraBackendType, LensFacing};
use viewfinder::config::CONFIG_VERSION;
use viewfinder::pipelines::photo::EncodingQuality;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("viewfinder-config-{}", uuid::Uuid::new_v4()))
        .join(name)
}

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.lens_facing, LensFacing::Back);
    assert_eq!(config.app_name, "Viewfinder");
    assert_eq!(config.focus_auto_cancel(), std::time::Duration::from_secs(3));
}

#[test]
fn test_config_roundtrip_through_file() {
    let path = temp_path("config.json");
    let config = Config {
        backend: CameraBackendType::TestPattern,
        lens_facing: LensFacing::Front,
        photo_quality: EncodingQuality::Maximum,
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_config_missing_keys_use_defaults() {
    let path = temp_path("partial.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{ "lens_facing": "Front" }"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.lens_facing, LensFacing::Front);
    assert_eq!(loaded.app_name, Config::default().app_name);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_config_ignores_retired_keys() {
    let path = temp_path("old.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        r#"{ "version": 1, "last_camera_path": "/dev/video2", "lens_facing": "Front" }"#,
    )
    .unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.lens_facing, LensFacing::Front);
    let saved = serde_json::to_string(&loaded).unwrap();
    assert!(!saved.contains("last_camera_path"));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_config_rejects_corrupt_and_newer_files() {
    let path = temp_path("bad.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load_from(&path).is_err());

    std::fs::write(&path, format!(r#"{{ "version": {} }}"#, CONFIG_VERSION + 1)).unwrap();
    assert!(Config::load_from(&path).is_err());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
