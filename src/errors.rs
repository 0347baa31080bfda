// SPDX-License-Identifier: MPL-2.0

//! Error types for the barcode scanner

use crate::backends::camera::PlatformError;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by a scanner session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// No barcode detection capability on this platform
    #[error("Barcode detection is not supported on this platform")]
    UnsupportedPlatform,
    /// The detector could not be constructed
    #[error("Error initializing barcode detector: {0}")]
    DetectorInit(String),
    /// Camera enumeration or acquisition failed
    #[error("Unable to access camera: {0}")]
    PermissionOrDevice(String),
    /// A single detection attempt failed
    #[error("Detection attempt failed: {0}")]
    TransientDetection(String),
}

/// Coarse classification of [`ScanError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Session cannot continue
    Terminal,
    /// User can retry (e.g. after granting permission)
    Recoverable,
    /// Logged and ignored
    Transient,
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::UnsupportedPlatform | ScanError::DetectorInit(_) => ErrorKind::Terminal,
            ScanError::PermissionOrDevice(_) => ErrorKind::Recoverable,
            ScanError::TransientDetection(_) => ErrorKind::Transient,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind() == ErrorKind::Terminal
    }

    /// Message shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            ScanError::UnsupportedPlatform => "Barcode detection is not supported on this device",
            ScanError::DetectorInit(_) => "Error initializing barcode detector",
            ScanError::PermissionOrDevice(_) => "Unable to access camera. Please check permissions.",
            ScanError::TransientDetection(_) => "Barcode detection failed",
        }
    }
}

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Scanner session errors
    #[error("Scanner error: {0}")]
    Scan(#[from] ScanError),
    /// Platform capability errors
    #[error("Camera error: {0}")]
    Platform(#[from] PlatformError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The scanner task is gone
    #[error("Scanner session has shut down")]
    ScannerClosed,
    /// Nothing was scanned in time
    #[error("No barcode detected within {0:?}")]
    Timeout(std::time::Duration),
    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}
