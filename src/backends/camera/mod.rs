// SPDX-License-Identifier: GPL-3.0-only

//! Camera capability boundary
//!
//! The scanner never talks to hardware directly. It depends on two traits:
//!
//! ```text
//! ┌─────────────────────┐
//! │   Scanner session   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ MediaDevices trait  │  ← enumerate + acquire
//! └──────────┬──────────┘
//!            │ Box<dyn MediaStream>
//!            ▼
//!    ┌──────────────┐  ┌─────────────┐
//!    │     V4L2     │  │ Still image │
//!    └──────────────┘  └─────────────┘
//! ```
//!
//! Tests substitute fakes for both traits.

pub mod format_converters;
pub mod frame_loop;
pub mod still_image;
pub mod types;
pub mod v4l2;

pub use types::*;

use async_trait::async_trait;

/// Device enumeration and stream acquisition
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every media device the platform exposes
    ///
    /// Callers filter by [`DeviceKind`]. Fails with
    /// [`PlatformError::PermissionDenied`] or [`PlatformError::NotSupported`]
    /// when the platform refuses enumeration.
    async fn enumerate_devices(&self) -> PlatformResult<Vec<MediaDeviceInfo>>;

    /// Open a live capture matching `constraints`
    ///
    /// The device id constraint is exact; facing mode and resolution are
    /// best-effort hints.
    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> PlatformResult<Box<dyn MediaStream>>;
}

/// A live capture owned by exactly one stream manager
pub trait MediaStream: Send {
    /// Device this stream is bound to
    fn device_id(&self) -> &DeviceId;

    /// Negotiated resolution (width, height)
    fn resolution(&self) -> (u32, u32);

    /// Most recent frame, `None` until the device delivers one
    fn current_frame(&self) -> Option<Frame>;

    /// Stop every track of the stream
    ///
    /// Must release the device before returning. Calling it twice is a no-op.
    fn stop(&mut self);

    /// Whether tracks are still running
    fn is_live(&self) -> bool;
}
