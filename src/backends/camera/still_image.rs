// SPDX-License-Identifier: GPL-3.0-only

//! Still image source
//!
//! Exposes an image file as a single virtual camera that delivers the same
//! frame for as long as the stream is live. Used by `scan --image` and for
//! exercising the scanner without hardware.

use super::types::*;
use super::{MediaDevices, MediaStream};
use crate::constants::file_formats;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of device ids served by [`StillImageDevices`]
pub const STILL_DEVICE_PREFIX: &str = "still:";

/// Virtual device list containing one image file
#[derive(Debug, Clone)]
pub struct StillImageDevices {
    path: PathBuf,
    device_id: DeviceId,
}

impl StillImageDevices {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let device_id = DeviceId::new(format!("{}{}", STILL_DEVICE_PREFIX, path.display()));
        Self { path, device_id }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn label(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string());
        format!("Still Image ({})", name)
    }
}

#[async_trait]
impl MediaDevices for StillImageDevices {
    async fn enumerate_devices(&self) -> PlatformResult<Vec<MediaDeviceInfo>> {
        Ok(vec![MediaDeviceInfo::video_input(
            self.device_id.clone(),
            self.label(),
        )])
    }

    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> PlatformResult<Box<dyn MediaStream>> {
        let requested = constraints.device_id.value();
        if *requested != self.device_id {
            return Err(PlatformError::DeviceNotFound(requested.to_string()));
        }

        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || load_luma_frame(&path))
            .await
            .map_err(|e| PlatformError::Io(format!("image load task failed: {e}")))??;

        Ok(Box::new(StillImageStream {
            device_id: self.device_id.clone(),
            frame,
            live: true,
        }))
    }
}

/// Load an image file as a luma frame
pub fn load_luma_frame(path: &Path) -> PlatformResult<Frame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    if !file_formats::is_image_extension(extension) {
        return Err(PlatformError::InvalidConfiguration(format!(
            "unsupported image format: '{}'",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => PlatformError::from(io),
        other => PlatformError::InvalidConfiguration(format!(
            "failed to load image '{}': {}",
            path.display(),
            other
        )),
    })?;

    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();

    info!(width, height, "Image loaded successfully");

    Ok(Frame::new(width, height, gray.into_raw()))
}

/// Stream that repeats one frame
pub struct StillImageStream {
    device_id: DeviceId,
    frame: Frame,
    live: bool,
}

impl MediaStream for StillImageStream {
    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn resolution(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn current_frame(&self) -> Option<Frame> {
        self.live.then(|| self.frame.clone())
    }

    fn stop(&mut self) {
        self.live = false;
    }

    fn is_live(&self) -> bool {
        self.live
    }
}
