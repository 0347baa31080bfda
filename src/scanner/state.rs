// SPDX-License-Identifier: GPL-3.0-only

//! Session state, the snapshot published to UIs, and control messages

use crate::backends::camera::{DeviceDescriptor, DeviceId};
use crate::backends::detector::DetectionResult;
use crate::errors::ScanError;

/// Mutable state owned by the scanner task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    /// Barcode detection is available on this platform
    pub supported: bool,
    /// Last non-transient error
    pub error: Option<ScanError>,
    /// The user asked for scanning and it has not ended yet
    pub scanning: bool,
    /// Camera used for the next acquisition
    pub selected_device_id: Option<DeviceId>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self {
            supported: true,
            error: None,
            scanning: false,
            selected_device_id: None,
        }
    }
}

/// Lifecycle phase shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No barcode detection capability; terminal
    Unsupported,
    /// Not scanning
    #[default]
    Idle,
    /// Waiting for the camera to open
    Acquiring,
    /// Camera open, detection loop running
    Live,
    /// Last operation failed, see [`SessionSnapshot::error`]
    Error,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Unsupported => "Unsupported",
            SessionPhase::Idle => "Idle",
            SessionPhase::Acquiring => "Starting camera",
            SessionPhase::Live => "Scanning",
            SessionPhase::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Read-only view of a session, published after every state change
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Support check and enumeration have finished
    pub ready: bool,
    pub supported: bool,
    pub error: Option<ScanError>,
    pub scanning: bool,
    pub selected_device_id: Option<DeviceId>,
    pub devices: Vec<DeviceDescriptor>,
    /// Waiting out the settle delay between two cameras
    pub switching_device: bool,
    /// Most recent decoded barcode
    pub last_detection: Option<DetectionResult>,
    /// Negotiated capture size while live
    pub resolution: Option<(u32, u32)>,
}

impl SessionSnapshot {
    /// The device picker is only offered when there is a choice to make
    pub fn show_device_selector(&self) -> bool {
        self.devices.len() >= 2
    }

    /// User-facing text for the current error, if any
    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(ScanError::user_message)
    }

    /// Position of the selected device in [`Self::devices`]
    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected_device_id.as_ref()?;
        self.devices.iter().position(|d| &d.id == selected)
    }

    /// Display label of the selected device
    pub fn selected_label(&self) -> Option<String> {
        let index = self.selected_index()?;
        Some(self.devices[index].display_label(index))
    }

    /// Device after the selected one, wrapping around
    pub fn next_device(&self) -> Option<&DeviceId> {
        if self.devices.is_empty() {
            return None;
        }
        let next = self.selected_index().map(|i| i + 1).unwrap_or(0) % self.devices.len();
        Some(&self.devices[next].id)
    }
}

/// Controls accepted by the scanner task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerMessage {
    /// Start scanning with the selected device
    Start,
    /// Stop scanning and release the camera
    Stop,
    /// Start when stopped, stop when scanning
    Toggle,
    /// Switch camera, restarting the scan if one is running
    SelectDevice(DeviceId),
    /// Release everything and end the task
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(devices: &[(&str, &str)], selected: Option<&str>) -> SessionSnapshot {
        SessionSnapshot {
            devices: devices
                .iter()
                .map(|(id, label)| DeviceDescriptor::new(*id, *label))
                .collect(),
            selected_device_id: selected.map(DeviceId::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_selector_hidden_for_single_device() {
        assert!(!snapshot_with(&[("a", "A")], Some("a")).show_device_selector());
        assert!(snapshot_with(&[("a", "A"), ("b", "B")], Some("a")).show_device_selector());
    }

    #[test]
    fn test_next_device_wraps() {
        let snapshot = snapshot_with(&[("a", "A"), ("b", "")], Some("b"));
        assert_eq!(snapshot.next_device(), Some(&DeviceId::from("a")));
        assert_eq!(
            snapshot_with(&[("a", "A"), ("b", "")], Some("a")).selected_label(),
            Some("A".to_string())
        );
        assert_eq!(snapshot.selected_label(), Some("Camera 2".to_string()));
    }

    #[test]
    fn test_error_message() {
        let snapshot = SessionSnapshot {
            error: Some(ScanError::PermissionOrDevice("denied".into())),
            ..Default::default()
        };
        assert_eq!(
            snapshot.error_message(),
            Some("Unable to access camera. Please check permissions.")
        );
    }
}
