// SPDX-License-Identifier: GPL-3.0-only

//! Barcode detection capability
//!
//! A [`DetectorProvider`] answers whether detection is available at all and
//! which symbologies it can decode, and builds a [`BarcodeDetector`] for a
//! requested set. The scanner only ever talks to these traits.

pub mod multi_format;

use crate::backends::camera::{Frame, PlatformResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use multi_format::{RxingDetector, RxingDetectorProvider};

/// Barcode symbology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code39,
    Code93,
    Code128,
    Codabar,
    Itf,
    QrCode,
}

impl Symbology {
    /// Formats found on retail food packaging
    pub const RETAIL: [Symbology; 6] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code39,
        Symbology::Code128,
    ];

    pub const ALL: [Symbology; 10] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code39,
        Symbology::Code93,
        Symbology::Code128,
        Symbology::Codabar,
        Symbology::Itf,
        Symbology::QrCode,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN-13",
            Symbology::Ean8 => "EAN-8",
            Symbology::UpcA => "UPC-A",
            Symbology::UpcE => "UPC-E",
            Symbology::Code39 => "Code 39",
            Symbology::Code93 => "Code 93",
            Symbology::Code128 => "Code 128",
            Symbology::Codabar => "Codabar",
            Symbology::Itf => "ITF",
            Symbology::QrCode => "QR Code",
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    pub raw_value: String,
    pub format: Symbology,
}

impl DetectionResult {
    pub fn new(raw_value: impl Into<String>, format: Symbology) -> Self {
        Self {
            raw_value: raw_value.into(),
            format,
        }
    }
}

/// Decodes barcodes from frames
#[async_trait]
pub trait BarcodeDetector: Send + Sync {
    /// Decode every barcode visible in `frame`
    ///
    /// Returns an empty list when nothing was found. Errors are per-call and
    /// do not invalidate the detector.
    async fn detect(&self, frame: &Frame) -> PlatformResult<Vec<DetectionResult>>;

    /// Symbologies this detector was built for
    fn formats(&self) -> &[Symbology];
}

/// Factory for [`BarcodeDetector`]s
pub trait DetectorProvider: Send + Sync {
    /// Whether barcode detection exists on this platform
    fn is_supported(&self) -> bool;

    /// Symbologies the platform can decode
    fn supported_formats(&self) -> Vec<Symbology>;

    /// Build a detector restricted to `formats`
    fn create(&self, formats: &[Symbology]) -> PlatformResult<Arc<dyn BarcodeDetector>>;
}
