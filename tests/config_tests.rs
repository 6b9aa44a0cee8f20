// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use insight_camera::Config;
use insight_camera::config::{ENV_API_KEY, ENV_DEVICE, ENV_ENDPOINT, ENV_MODEL};
use insight_camera::constants::{capture, endpoint};
use std::path::PathBuf;

fn temp_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("insight-camera-test-{}", uuid::Uuid::new_v4()))
        .join("config.json")
}

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.endpoint_url, endpoint::DEFAULT_URL);
    assert_eq!(config.model, endpoint::DEFAULT_MODEL);
    assert_eq!(config.camera_device, capture::DEFAULT_DEVICE);
    assert!(
        config.credential().is_none(),
        "No credential should be configured by default"
    );
}

#[test]
fn test_config_save_and_load() {
    let path = temp_path();
    let mut config = Config::default();
    config.model = "other-model".to_string();
    config.capture.width = 640;

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_config_invalid_file() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert_eq!(err.kind().as_str(), "config");

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_env_overrides() {
    let mut config = Config::default();
    config.apply_env_overrides(|name| match name {
        n if n == ENV_API_KEY => Some("key".to_string()),
        n if n == ENV_ENDPOINT => Some("http://localhost:8080".to_string()),
        n if n == ENV_MODEL => Some("local".to_string()),
        n if n == ENV_DEVICE => Some("/dev/video2".to_string()),
        _ => None,
    });

    assert_eq!(config.credential(), Some("key"));
    assert_eq!(config.endpoint_url, "http://localhost:8080");
    assert_eq!(config.model, "local");
    assert_eq!(config.camera_device, "/dev/video2");
}

#[test]
fn test_stream_constraints_follow_capture_settings() {
    let mut config = Config::default();
    config.capture.width = 320;
    config.capture.height = 240;
    let constraints = config.stream_constraints();
    assert_eq!((constraints.width, constraints.height), (320, 240));
}
