// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use insight_camera::constants::{file_formats, retry};
use insight_camera::retry::RetryPolicy;
use std::time::Duration;

#[test]
fn test_default_retry_budget() {
    // Three attempts, waiting 1s then 2s
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, retry::MAX_ATTEMPTS);
    assert_eq!(policy.backoff(0), Duration::from_millis(1000));
    assert_eq!(policy.backoff(1), Duration::from_millis(2000));
}

#[test]
fn test_backoff_doubles() {
    let policy = RetryPolicy::default();
    let mut previous = policy.backoff(0);
    for attempt in 1..6 {
        let next = policy.backoff(attempt);
        assert_eq!(next, previous * 2, "Backoff should double per attempt");
        previous = next;
    }
}

#[test]
fn test_image_extensions_have_mime_types() {
    for ext in file_formats::IMAGE_EXTENSIONS {
        let mime = file_formats::mime_for_extension(ext);
        assert!(
            mime.is_some_and(|m| m.starts_with("image/")),
            "Extension {} has no image MIME type",
            ext
        );
    }
}

#[test]
fn test_extension_check_is_case_insensitive() {
    assert!(file_formats::is_image_extension("PNG"));
    assert!(file_formats::is_image_extension("Jpeg"));
    assert!(!file_formats::is_image_extension("txt"));
}
