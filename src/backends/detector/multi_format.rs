// SPDX-License-Identifier: GPL-3.0-only

//! Barcode detection backed by the rxing crate
//!
//! Decoding is CPU-bound, so each call runs on the blocking pool. rxing
//! reports "nothing found" as an error; that case is an empty result here.

use super::{BarcodeDetector, DetectionResult, DetectorProvider, Symbology};
use crate::backends::camera::{Frame, PlatformError, PlatformResult};
use async_trait::async_trait;
use rxing::BarcodeFormat;
use std::sync::Arc;
use tracing::{debug, trace};

/// Provider for [`RxingDetector`]
#[derive(Debug, Default, Clone)]
pub struct RxingDetectorProvider;

impl RxingDetectorProvider {
    pub fn new() -> Self {
        Self
    }
}

impl DetectorProvider for RxingDetectorProvider {
    fn is_supported(&self) -> bool {
        true
    }

    fn supported_formats(&self) -> Vec<Symbology> {
        Symbology::ALL.to_vec()
    }

    fn create(&self, formats: &[Symbology]) -> PlatformResult<Arc<dyn BarcodeDetector>> {
        Ok(Arc::new(RxingDetector::new(formats)?))
    }
}

/// Multi-format barcode detector
#[derive(Debug, Clone)]
pub struct RxingDetector {
    formats: Vec<Symbology>,
}

impl RxingDetector {
    pub fn new(formats: &[Symbology]) -> PlatformResult<Self> {
        if formats.is_empty() {
            return Err(PlatformError::InvalidConfiguration(
                "no barcode formats requested".to_string(),
            ));
        }
        Ok(Self {
            formats: formats.to_vec(),
        })
    }
}

#[async_trait]
impl BarcodeDetector for RxingDetector {
    async fn detect(&self, frame: &Frame) -> PlatformResult<Vec<DetectionResult>> {
        if !frame.is_valid() {
            return Err(PlatformError::DetectionFailed(format!(
                "frame buffer does not match {}x{}",
                frame.width, frame.height
            )));
        }

        let frame = frame.clone();
        let formats = self.formats.clone();

        tokio::task::spawn_blocking(move || detect_sync(&frame, &formats))
            .await
            .map_err(|e| PlatformError::DetectionFailed(format!("detection task failed: {e}")))
    }

    fn formats(&self) -> &[Symbology] {
        &self.formats
    }
}

/// Synchronous detection (runs in blocking task)
fn detect_sync(frame: &Frame, formats: &[Symbology]) -> Vec<DetectionResult> {
    let start = std::time::Instant::now();

    let decoded =
        match rxing::helpers::detect_multiple_in_luma(frame.luma.to_vec(), frame.width, frame.height) {
            Ok(results) => results,
            Err(e) => {
                trace!(error = %e, elapsed_ms = start.elapsed().as_millis(), "No barcode decoded");
                return Vec::new();
            }
        };

    let detections: Vec<DetectionResult> = decoded
        .iter()
        .filter_map(|result| {
            let format = symbology_for(result.getBarcodeFormat())?;
            if !formats.contains(&format) {
                debug!(format = %format, "Ignoring barcode outside requested formats");
                return None;
            }
            Some(DetectionResult::new(result.getText(), format))
        })
        .collect();

    trace!(
        count = detections.len(),
        width = frame.width,
        height = frame.height,
        elapsed_ms = start.elapsed().as_millis(),
        "Barcode detection complete"
    );

    detections
}

/// Map an rxing format to a [`Symbology`]
fn symbology_for(format: &BarcodeFormat) -> Option<Symbology> {
    match format {
        BarcodeFormat::EAN_13 => Some(Symbology::Ean13),
        BarcodeFormat::EAN_8 => Some(Symbology::Ean8),
        BarcodeFormat::UPC_A => Some(Symbology::UpcA),
        BarcodeFormat::UPC_E => Some(Symbology::UpcE),
        BarcodeFormat::CODE_39 => Some(Symbology::Code39),
        BarcodeFormat::CODE_93 => Some(Symbology::Code93),
        BarcodeFormat::CODE_128 => Some(Symbology::Code128),
        BarcodeFormat::CODABAR => Some(Symbology::Codabar),
        BarcodeFormat::ITF => Some(Symbology::Itf),
        BarcodeFormat::QR_CODE => Some(Symbology::QrCode),
        _ => None,
    }
}
