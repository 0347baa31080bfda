// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use barcode_scanner::Config;
use barcode_scanner::constants::{file_formats, timing, ui};
use std::time::Duration;

#[test]
fn test_detection_interval_exceeds_frame_period() {
    // Detection must run less often than frames arrive
    let frame_period_ms = 1000 / u64::from(timing::FRAME_RATE_HZ);
    assert!(timing::DETECTION_INTERVAL_MS > frame_period_ms);
    assert_eq!(
        Config::default().detection_interval(),
        Duration::from_millis(timing::DETECTION_INTERVAL_MS)
    );
}

#[test]
fn test_device_switch_settle_is_positive() {
    assert!(timing::DEVICE_SWITCH_SETTLE_MS > 0);
    assert_eq!(
        Config::default().device_switch_settle(),
        Duration::from_millis(timing::DEVICE_SWITCH_SETTLE_MS)
    );
}

#[test]
fn test_scan_target_fits_preview() {
    for fraction in [ui::TARGET_WIDTH_FRACTION, ui::TARGET_HEIGHT_FRACTION] {
        assert!(fraction > 0.0 && fraction <= 1.0);
    }
}

#[test]
fn test_image_extensions() {
    assert!(file_formats::is_image_extension("png"));
    assert!(file_formats::is_image_extension("JPG"));
    assert!(!file_formats::is_image_extension("mp4"));
}
