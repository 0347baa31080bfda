// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Platform identifier of a capture device
///
/// For V4L2 this is the device node path (e.g. `/dev/video0`), for the
/// still-image source it is a `still:` prefixed file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of device reported by enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Camera or other video capture input
    VideoInput,
    /// Microphone
    AudioInput,
    /// Metadata nodes, output-only devices, codecs
    Other,
}

/// Raw enumeration entry as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub id: DeviceId,
    /// Human-readable label, may be empty when the platform hides it
    pub label: String,
    pub kind: DeviceKind,
}

impl MediaDeviceInfo {
    pub fn video_input(id: impl Into<DeviceId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }
}

/// Camera input that can be selected for scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub label: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<DeviceId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Label shown in the device picker
    ///
    /// Devices without a label get a positional name (`Camera 1`, `Camera 2`, ...).
    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

impl From<MediaDeviceInfo> for DeviceDescriptor {
    fn from(info: MediaDeviceInfo) -> Self {
        Self {
            id: info.id,
            label: info.label,
        }
    }
}

/// Direction a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front camera, pointing at the user
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

/// A single capture constraint
///
/// `Exact` constraints must be honored or acquisition fails; `Ideal`
/// constraints are hints the platform may negotiate away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint<T> {
    Exact(T),
    Ideal(T),
}

impl<T> Constraint<T> {
    pub fn value(&self) -> &T {
        match self {
            Constraint::Exact(v) | Constraint::Ideal(v) => v,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Constraint::Exact(_))
    }
}

/// Capture request passed to [`super::MediaDevices::acquire_stream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    pub device_id: Constraint<DeviceId>,
    pub facing_mode: Constraint<FacingMode>,
    pub width: Constraint<u32>,
    pub height: Constraint<u32>,
}

impl StreamConstraints {
    /// Exact device match with an environment-facing, resolution-hinted capture
    pub fn for_device(device_id: DeviceId, ideal_width: u32, ideal_height: u32) -> Self {
        Self {
            device_id: Constraint::Exact(device_id),
            facing_mode: Constraint::Ideal(FacingMode::Environment),
            width: Constraint::Ideal(ideal_width),
            height: Constraint::Ideal(ideal_height),
        }
    }
}

impl std::fmt::Display for StreamConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, ~{}x{})",
            self.device_id.value(),
            self.facing_mode.value(),
            self.width.value(),
            self.height.value()
        )
    }
}

/// Grayscale frame sampled from a live stream
///
/// Barcode decoding only needs luminance, so backends convert whatever the
/// device delivers into tightly packed 8-bit luma before publishing.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// `width * height` bytes, row-major, no padding
    pub luma: Arc<[u8]>,
    /// Timestamp when the frame was captured
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(width: u32, height: u32, luma: Vec<u8>) -> Self {
        Self {
            width,
            height,
            luma: Arc::from(luma),
            captured_at: Instant::now(),
        }
    }

    /// Check that the luma buffer matches the frame dimensions
    pub fn is_valid(&self) -> bool {
        self.luma.len() == self.width as usize * self.height as usize
    }

    /// Luma value at (x, y), clamped to the frame bounds
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        self.luma
            .get(y * self.width as usize + x)
            .copied()
            .unwrap_or(0)
    }
}

/// Result type for capability-boundary operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors reported by platform capabilities (devices, streams, detectors)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The capability is missing entirely
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// The user or OS denied access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Device was removed or never existed
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    /// Device is held by another process
    #[error("Device busy: {0}")]
    DeviceBusy(String),
    /// Requested configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A single detection call failed
    #[error("Detection failed: {0}")]
    DetectionFailed(String),
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => PlatformError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => PlatformError::DeviceNotFound(err.to_string()),
            std::io::ErrorKind::ResourceBusy => PlatformError::DeviceBusy(err.to_string()),
            _ => PlatformError::Io(err.to_string()),
        }
    }
}
