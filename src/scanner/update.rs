// SPDX-License-Identifier: GPL-3.0-only

//! Message and event handlers for the scanner task

use super::Scanner;
use super::detection::{AttemptOutcome, Resolution};
use super::state::ScannerMessage;
use crate::backends::camera::DeviceId;
use crate::errors::ScanError;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

impl Scanner {
    pub(super) async fn update(&mut self, message: ScannerMessage) {
        debug!(message = ?message, "Scanner message");
        match message {
            ScannerMessage::Start => self.handle_start().await,
            ScannerMessage::Stop => self.handle_stop(),
            ScannerMessage::Toggle => self.handle_toggle().await,
            ScannerMessage::SelectDevice(id) => self.handle_select_device(id),
            // Handled by the run loop
            ScannerMessage::Shutdown => {}
        }
    }

    async fn handle_start(&mut self) {
        if !self.can_scan() {
            debug!("Scanning unavailable, ignoring start");
            return;
        }
        if self.session.scanning || self.resume_at.is_some() {
            debug!("Already scanning");
            return;
        }
        self.start_scanning().await;
    }

    fn handle_stop(&mut self) {
        if self.resume_at.take().is_some() {
            info!("Stop during device switch, cancelling resume");
        }
        if self.session.scanning || self.stream.is_live() {
            info!("Stopping scan");
        }
        self.halt_scanning();
    }

    async fn handle_toggle(&mut self) {
        if self.session.scanning || self.resume_at.is_some() {
            self.handle_stop();
        } else {
            self.handle_start().await;
        }
    }

    fn handle_select_device(&mut self, id: DeviceId) {
        if !self.devices.contains(&id) {
            warn!(device = %id, "Ignoring selection of unknown camera");
            return;
        }
        if self.session.selected_device_id.as_ref() == Some(&id) {
            debug!(device = %id, "Camera already selected");
            return;
        }

        info!(device = %id, "Selected camera");
        self.session.selected_device_id = Some(id);

        let was_scanning = self.session.scanning || self.resume_at.is_some();
        if was_scanning {
            // Old stream must be fully released before the new one opens
            self.halt_scanning();
            let settle = self.config.device_switch_settle();
            debug!(settle_ms = settle.as_millis(), "Waiting before reopening camera");
            self.resume_at = Some(Instant::now() + settle);
        }
    }

    /// Settle delay after a device switch has elapsed
    pub(super) async fn resume(&mut self) {
        if self.resume_at.take().is_none() {
            return;
        }
        info!("Resuming scan on new camera");
        self.start_scanning().await;
    }

    /// Acquire the selected camera and start the detection loop
    async fn start_scanning(&mut self) {
        let Some(device) = self.session.selected_device_id.clone() else {
            warn!("No camera selected, cannot start scanning");
            return;
        };

        // A new attempt clears a previous camera error
        if matches!(self.session.error, Some(ScanError::PermissionOrDevice(_))) {
            self.session.error = None;
        }
        self.stream.reset();

        self.session.scanning = true;
        let constraints = self.stream.begin_acquire(&device);
        self.publish();

        // Commands stay live while the platform opens the camera
        let (result, interrupt) = {
            let acquire = self.stream.acquire(constraints);
            tokio::pin!(acquire);
            loop {
                tokio::select! {
                    biased;

                    message = self.commands.recv() => match message {
                        Some(ScannerMessage::Start) => debug!("Camera already opening"),
                        Some(ScannerMessage::SelectDevice(id))
                            if id == device || !self.devices.contains(&id) =>
                        {
                            debug!(device = %id, "Ignoring selection while camera opens");
                        }
                        other => break (None, Some(other)),
                    },

                    result = &mut acquire => break (Some(result), None),
                }
            }
        };

        match result {
            Some(Ok(())) => {
                self.detection.start();
                info!(device = %device, "Scanning started");
            }
            Some(Err(e)) => {
                self.session.scanning = false;
                self.detection.cancel();
                self.session.error = Some(e);
            }
            None => self.interrupt_acquisition(interrupt.flatten()),
        }
    }

    /// Abandon a pending acquisition in favor of `message`
    ///
    /// `None` means the command channel closed.
    fn interrupt_acquisition(&mut self, message: Option<ScannerMessage>) {
        info!(message = ?message, "Camera acquisition interrupted");
        self.halt_scanning();

        match message {
            Some(ScannerMessage::SelectDevice(id)) => {
                info!(device = %id, "Selected camera");
                self.session.selected_device_id = Some(id);
                self.resume_at = Some(Instant::now() + self.config.device_switch_settle());
            }
            Some(ScannerMessage::Shutdown) | None => self.shutdown_requested = true,
            // Stop and Toggle both end the attempt
            Some(_) => {}
        }
    }

    /// Cancel the detection loop and release the stream
    pub(super) fn halt_scanning(&mut self) {
        self.detection.cancel();
        self.stream.teardown();
        self.session.scanning = false;
    }

    pub(super) fn frame_tick(&mut self, t: Duration) {
        if self.stream.has_ended() {
            warn!("Camera stream ended unexpectedly");
            self.detection.cancel();
            self.stream.fail();
            self.session.scanning = false;
            self.session.error = Some(ScanError::PermissionOrDevice(
                "camera stream ended".to_string(),
            ));
            return;
        }

        let frame = self.stream.present();
        let Some(detector) = self.detector.as_ref() else {
            return;
        };
        if self.detection.on_tick(t, frame, detector) {
            trace!(t_ms = t.as_millis(), "Detection attempt started");
        }
    }

    pub(super) fn detection_outcome(&mut self, outcome: AttemptOutcome) {
        match self.detection.resolve(outcome) {
            Resolution::Discarded => {}
            Resolution::Empty => trace!("No barcode in frame"),
            Resolution::Failed(e) => debug!(error = %e, "Detection attempt failed"),
            Resolution::Detected(result) => {
                info!(format = %result.format, value = %result.raw_value, "Barcode detected");
                self.halt_scanning();
                let code = result.raw_value.clone();
                self.last_detection = Some(result);
                // Hosts reading the snapshot from the callback see scanning stopped
                self.publish();
                (self.on_detected)(code);
            }
        }
    }
}
