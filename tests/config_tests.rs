// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use photobooth::Config;
use photobooth::errors::AppError;
use std::path::PathBuf;

#[test]
fn test_config_default() {
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.countdown_seconds, 3);
    assert!(!config.mirror_preview, "Captures are not mirrored by default");
    assert!(config.record_video, "Recording should be enabled by default");
    assert!(config.camera_device.is_none());
    assert!(config.metadata_timeout_secs.is_none());
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        countdown_seconds: 10,
        mirror_preview: true,
        camera_device: Some("/dev/video2".into()),
        alternate_templates: vec![PathBuf::from("/tmp/wedding.png")],
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "countdown_seconds": 5 }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.countdown_seconds, 5);
    assert!(config.record_video);
    assert_eq!(config.display_width, Config::default().display_width);
}

#[test]
fn test_zero_countdown_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "countdown_seconds": 0 }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.countdown(), 3);

    let config = Config {
        countdown_seconds: 7,
        ..Config::default()
    };
    assert_eq!(config.countdown(), 7);
}

#[test]
fn test_malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
}

#[test]
fn test_output_dir_override() {
    let config = Config {
        output_dir: Some(PathBuf::from("/srv/booth")),
        ..Config::default()
    };
    assert_eq!(config.output_dir(), PathBuf::from("/srv/booth"));
}
