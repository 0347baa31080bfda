// SPDX-License-Identifier: GPL-3.0-only

//! Barcode detection capability check

use crate::backends::detector::{BarcodeDetector, DetectorProvider, Symbology};
use crate::errors::ScanError;
use std::sync::Arc;
use tracing::{info, warn};

/// Check for detection support and build a detector for `formats`
///
/// Returns [`ScanError::UnsupportedPlatform`] when the platform has no
/// detector at all and [`ScanError::DetectorInit`] when it cannot decode the
/// requested formats or construction fails.
pub fn check_support(
    provider: &dyn DetectorProvider,
    formats: &[Symbology],
) -> Result<Arc<dyn BarcodeDetector>, ScanError> {
    if !provider.is_supported() {
        warn!("Barcode detection is not supported on this platform");
        return Err(ScanError::UnsupportedPlatform);
    }

    if formats.is_empty() {
        return Err(ScanError::DetectorInit(
            "no barcode formats requested".to_string(),
        ));
    }

    let supported = provider.supported_formats();
    let missing: Vec<String> = formats
        .iter()
        .filter(|f| !supported.contains(f))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Requested barcode formats are not supported");
        return Err(ScanError::DetectorInit(format!(
            "unsupported formats: {}",
            missing.join(", ")
        )));
    }

    let detector = provider.create(formats).map_err(|e| {
        warn!(error = %e, "Failed to create barcode detector");
        ScanError::DetectorInit(e.to_string())
    })?;

    info!(formats = ?formats, "Barcode detector ready");
    Ok(detector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::detector::RxingDetectorProvider;

    #[test]
    fn test_support_with_retail_formats() {
        let detector = check_support(&RxingDetectorProvider::new(), &Symbology::RETAIL).unwrap();
        assert_eq!(detector.formats(), &Symbology::RETAIL);
    }

    #[test]
    fn test_support_rejects_empty_formats() {
        let result = check_support(&RxingDetectorProvider::new(), &[]);
        assert!(matches!(result, Err(ScanError::DetectorInit(_))));
    }
}
