// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for capture, detection and frame timing
//!
//! This module provides the platform capabilities the scanner depends on:
//! - Camera enumeration and capture via V4L2, or a still image
//! - Barcode decoding via rxing
//! - Frame callback cadence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Scanner session                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │   Camera    │    │     Detector     │   │
//! │  │ (V4L2/file) │    │     (rxing)      │   │
//! │  └─────────────┘    └──────────────────┘   │
//! │                     ┌──────────────────┐   │
//! │                     │   Frame clock    │   │
//! │                     │     (tokio)      │   │
//! │                     └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device enumeration and frame capture
//! - [`detector`]: Barcode detection capability
//! - [`clock`]: Frame callback timing for the detection loop

pub mod camera;
pub mod clock;
pub mod detector;
