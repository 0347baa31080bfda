// SPDX-License-Identifier: MPL-2.0

//! Barcode Scanner - camera barcode capture for food logging
//!
//! This library provides the capture loop behind barcode-based food entry:
//! camera enumeration, stream lifecycle, and a throttled detection loop that
//! hands the first decoded barcode to the host.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera, barcode detector and frame clock capabilities
//! - [`scanner`]: Scanner session state machine and host handle
//! - [`config`]: User configuration handling
//! - [`manual_entry`]: Typed barcode fallback with check digit validation
//! - [`terminal`]: Interactive terminal front end
//!
//! # Example
//!
//! ```ignore
//! let platform = Platform::new(
//!     Arc::new(V4l2MediaDevices::new()),
//!     Arc::new(RxingDetectorProvider::new()),
//!     &config,
//! );
//! let handle = scanner::spawn(platform, config, Box::new(|code| println!("{code}")));
//! handle.send(ScannerMessage::Start).await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod manual_entry;
pub mod scanner;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, ScanError};
pub use scanner::{Platform, ScannerHandle, ScannerMessage, SessionPhase, SessionSnapshot};
