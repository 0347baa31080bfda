// SPDX-License-Identifier: GPL-3.0-only

//! Camera enumeration and default selection

use crate::backends::camera::{DeviceDescriptor, DeviceId, DeviceKind, MediaDeviceInfo, MediaDevices};
use crate::constants::devices::is_environment_label;
use crate::errors::ScanError;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Cameras available to a session
///
/// Enumeration runs once; later calls return the cached result.
#[derive(Debug, Default)]
pub struct DeviceList {
    devices: Vec<DeviceDescriptor>,
    enumerated: bool,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerate video inputs
    ///
    /// A failed enumeration leaves the list empty and is not retried.
    pub async fn enumerate(
        &mut self,
        media: &dyn MediaDevices,
    ) -> Result<&[DeviceDescriptor], ScanError> {
        if self.enumerated {
            debug!(count = self.devices.len(), "Using cached device list");
            return Ok(&self.devices);
        }
        self.enumerated = true;

        let infos = media.enumerate_devices().await.map_err(|e| {
            warn!(error = %e, "Failed to enumerate cameras");
            ScanError::PermissionOrDevice(e.to_string())
        })?;

        self.devices = video_inputs(infos);
        info!(count = self.devices.len(), "Enumerated cameras");
        for (index, device) in self.devices.iter().enumerate() {
            debug!(index, id = %device.id, label = %device.display_label(index), "Camera");
        }

        Ok(&self.devices)
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.iter().any(|d| &d.id == id)
    }
}

/// Keep video inputs, dropping repeated ids
pub fn video_inputs(infos: Vec<MediaDeviceInfo>) -> Vec<DeviceDescriptor> {
    let mut seen = HashSet::new();
    infos
        .into_iter()
        .filter(|info| info.kind == DeviceKind::VideoInput)
        .filter(|info| {
            let fresh = seen.insert(info.id.clone());
            if !fresh {
                debug!(id = %info.id, "Dropping duplicate device");
            }
            fresh
        })
        .map(DeviceDescriptor::from)
        .collect()
}

/// Whether the device looks like a rear camera
pub fn is_environment_facing(device: &DeviceDescriptor) -> bool {
    is_environment_label(&device.label)
}

/// Pick the camera to use when the user has not chosen one
///
/// Prefers a rear camera, otherwise the first one listed.
pub fn select_default(devices: &[DeviceDescriptor]) -> Option<&DeviceDescriptor> {
    devices
        .iter()
        .find(|d| is_environment_facing(d))
        .or_else(|| devices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(list: &[(&str, &str)]) -> Vec<DeviceDescriptor> {
        list.iter()
            .map(|(id, label)| DeviceDescriptor::new(*id, *label))
            .collect()
    }

    #[test]
    fn test_prefers_back_camera() {
        let devices = descriptors(&[("f", "Front Camera"), ("b", "Back Camera")]);
        assert_eq!(select_default(&devices).unwrap().id.as_str(), "b");
    }

    #[test]
    fn test_falls_back_to_first() {
        let devices = descriptors(&[("x", "USB Camera")]);
        assert_eq!(select_default(&devices).unwrap().id.as_str(), "x");
        assert!(select_default(&[]).is_none());
    }

    #[test]
    fn test_environment_keyword_is_case_insensitive() {
        let devices = descriptors(&[("u", "Integrated"), ("e", "Camera facing Environment")]);
        assert_eq!(select_default(&devices).unwrap().id.as_str(), "e");
    }

    #[test]
    fn test_video_inputs_filters_and_dedupes() {
        let infos = vec![
            MediaDeviceInfo::video_input("a", "First"),
            MediaDeviceInfo {
                id: DeviceId::from("mic"),
                label: "Microphone".into(),
                kind: DeviceKind::AudioInput,
            },
            MediaDeviceInfo::video_input("a", "Duplicate"),
            MediaDeviceInfo::video_input("b", ""),
        ];
        let devices = video_inputs(infos);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].label, "First");
        assert_eq!(devices[1].display_label(1), "Camera 2");
    }
}
