// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Minimum spacing between two detection attempts
    pub const DETECTION_INTERVAL_MS: u64 = 200;

    /// Pause between tearing down one camera and opening the next
    pub const DEVICE_SWITCH_SETTLE_MS: u64 = 100;

    /// Frame callback rate driving the detection loop
    pub const FRAME_RATE_HZ: u32 = 60;

    /// Terminal UI redraw/input poll period
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(33);
}

/// Capture request defaults
pub mod capture {
    /// Ideal capture width (best-effort)
    pub const IDEAL_WIDTH: u32 = 1280;

    /// Ideal capture height (best-effort)
    pub const IDEAL_HEIGHT: u32 = 720;
}

/// V4L2 capture pipeline
pub mod pipeline {
    /// Number of memory-mapped buffers requested from the driver
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Consecutive dequeue failures before the capture thread gives up
    pub const MAX_CONSECUTIVE_CAPTURE_FAILURES: u32 = 30;
}

/// Default camera selection
pub mod devices {
    /// Label keywords identifying a rear (environment-facing) camera
    pub const ENVIRONMENT_LABEL_KEYWORDS: &[&str] = &["back", "environment"];

    /// Whether a device label names a rear camera (case-insensitive)
    pub fn is_environment_label(label: &str) -> bool {
        let label = label.to_lowercase();
        ENVIRONMENT_LABEL_KEYWORDS
            .iter()
            .any(|keyword| label.contains(keyword))
    }
}

/// Terminal UI
pub mod ui {
    /// Hint drawn under the scan target while scanning
    pub const SCAN_HINT: &str = "Position barcode in the center";

    /// Scan target size relative to the preview
    pub const TARGET_WIDTH_FRACTION: f32 = 0.7;
    pub const TARGET_HEIGHT_FRACTION: f32 = 0.4;

    /// Shown instead of the scanner when detection is unavailable
    pub const UNSUPPORTED_FALLBACK: &str =
        "Barcode scanning is not available. Press 'm' to enter the barcode manually.";
}

/// Resolution labels for the status bar
pub fn get_resolution_label(width: u32) -> Option<&'static str> {
    match width {
        w if w >= 3840 => Some("4K"), // 3840x2160
        w if w >= 2560 => Some("2K"), // 2560x1440
        w if w >= 1920 => Some("FHD"), // 1920x1080
        w if w >= 1280 => Some("HD"), // 1280x720
        w if w >= 640 => Some("SD"),  // 640x480
        _ => None,
    }
}

/// Supported file formats for the still image source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Application name, also the config directory name
    pub const APP_NAME: &str = "barcode-scanner";

    /// Get the application version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_labels() {
        assert_eq!(get_resolution_label(3840), Some("4K"));
        assert_eq!(get_resolution_label(1280), Some("HD"));
        assert_eq!(get_resolution_label(640), Some("SD"));
        assert_eq!(get_resolution_label(320), None);
    }

    #[test]
    fn test_environment_labels() {
        assert!(devices::is_environment_label("Back Camera"));
        assert!(devices::is_environment_label("camera2 0, facing ENVIRONMENT"));
        assert!(!devices::is_environment_label("Front Camera"));
        assert!(!devices::is_environment_label("USB Camera"));
    }
}
