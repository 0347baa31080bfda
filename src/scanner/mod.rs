// SPDX-License-Identifier: GPL-3.0-only

//! Barcode scanner session
//!
//! A session is one tokio task that owns the detector, the device list,
//! the live stream and the detection loop. Hosts drive it with
//! [`ScannerMessage`]s through a [`ScannerHandle`] and watch
//! [`SessionSnapshot`]s and preview frames.
//!
//! ```text
//!  host UI ──ScannerMessage──▶ ┌────────────────────────────┐
//!                              │ Scanner task               │
//!                              │  check support → enumerate │
//!                              │  select! {                 │
//!                              │    commands                │
//!                              │    device switch resume    │
//!                              │    detection outcome       │
//!                              │    frame tick              │
//!                              │  }                         │
//!  host UI ◀─SessionSnapshot── │  teardown on exit          │
//!  preview ◀──────Frame─────── └────────────────────────────┘
//! ```

pub mod capability;
pub mod detection;
pub mod devices;
pub mod handle;
pub mod state;
pub mod stream;
mod update;

pub use capability::check_support;
pub use detection::{DetectionLoop, Resolution};
pub use devices::{DeviceList, is_environment_facing, select_default};
pub use handle::ScannerHandle;
pub use state::{CaptureSession, ScannerMessage, SessionPhase, SessionSnapshot};
pub use stream::{StreamManager, StreamState};

use crate::backends::camera::MediaDevices;
use crate::backends::camera::still_image::StillImageDevices;
use crate::backends::camera::v4l2::V4l2MediaDevices;
use crate::backends::clock::{FrameClock, IntervalClock};
use crate::backends::detector::{
    BarcodeDetector, DetectionResult, DetectorProvider, RxingDetectorProvider,
};
use crate::config::Config;
use crate::errors::ScanError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Capacity of the command channel
const COMMAND_CAPACITY: usize = 32;

/// Called once per successful scan with the decoded value
pub type DetectionCallback = Box<dyn FnMut(String) + Send>;

/// Platform capabilities a session runs against
pub struct Platform {
    pub media: Arc<dyn MediaDevices>,
    pub detectors: Arc<dyn DetectorProvider>,
    pub clock: Box<dyn FrameClock>,
}

impl Platform {
    /// Capabilities with a frame clock matching `config`
    pub fn new(
        media: Arc<dyn MediaDevices>,
        detectors: Arc<dyn DetectorProvider>,
        config: &Config,
    ) -> Self {
        Self {
            media,
            detectors,
            clock: Box::new(IntervalClock::with_rate(config.frame_rate_hz)),
        }
    }

    /// V4L2 cameras with the rxing detector
    pub fn native(config: &Config) -> Self {
        Self::new(
            Arc::new(V4l2MediaDevices::new()),
            Arc::new(RxingDetectorProvider::new()),
            config,
        )
    }

    /// An image file as the only camera, with the rxing detector
    pub fn still_image(path: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(
            Arc::new(StillImageDevices::new(path)),
            Arc::new(RxingDetectorProvider::new()),
            config,
        )
    }
}

/// Start a scanner session on the current runtime
pub fn spawn(platform: Platform, config: Config, on_detected: DetectionCallback) -> ScannerHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
    let (preview_tx, preview_rx) = watch::channel(None);

    let scanner = Scanner::new(
        platform,
        config,
        on_detected,
        command_rx,
        snapshot_tx,
        preview_tx,
    );
    let task = tokio::spawn(scanner.run());

    ScannerHandle::new(command_tx, snapshot_rx, preview_rx, task)
}

/// Session state machine, owned by the scanner task
pub(crate) struct Scanner {
    config: Config,
    session: CaptureSession,
    ready: bool,
    detectors: Arc<dyn DetectorProvider>,
    media: Arc<dyn MediaDevices>,
    detector: Option<Arc<dyn BarcodeDetector>>,
    devices: DeviceList,
    stream: StreamManager,
    detection: DetectionLoop,
    clock: Box<dyn FrameClock>,
    /// Pending restart after a device switch
    resume_at: Option<Instant>,
    last_detection: Option<DetectionResult>,
    on_detected: DetectionCallback,
    commands: mpsc::Receiver<ScannerMessage>,
    /// Set when the host asked to shut down while a handler was running
    shutdown_requested: bool,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Scanner {
    fn new(
        platform: Platform,
        config: Config,
        on_detected: DetectionCallback,
        commands: mpsc::Receiver<ScannerMessage>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        preview_tx: watch::Sender<Option<crate::backends::camera::Frame>>,
    ) -> Self {
        let stream = StreamManager::new(
            Arc::clone(&platform.media),
            preview_tx,
            config.ideal_width,
            config.ideal_height,
        );
        let detection = DetectionLoop::new(config.detection_interval());

        Self {
            config,
            session: CaptureSession::default(),
            ready: false,
            detectors: platform.detectors,
            media: platform.media,
            detector: None,
            devices: DeviceList::new(),
            stream,
            detection,
            clock: platform.clock,
            resume_at: None,
            last_detection: None,
            on_detected,
            commands,
            shutdown_requested: false,
            snapshot_tx,
        }
    }

    async fn run(mut self) {
        self.initialize().await;
        self.publish();

        loop {
            let resume_at = self.resume_at;
            let awaiting_result = self.detection.has_pending();
            let ticking = self.detection.is_active() && !awaiting_result && self.stream.is_live();

            tokio::select! {
                biased;

                message = self.commands.recv() => match message {
                    None | Some(ScannerMessage::Shutdown) => break,
                    Some(message) => self.update(message).await,
                },

                _ = tokio::time::sleep_until(resume_at.unwrap_or_else(Instant::now)),
                    if resume_at.is_some() =>
                {
                    self.resume().await;
                }

                outcome = self.detection.next_outcome(), if awaiting_result => {
                    self.detection_outcome(outcome);
                }

                t = self.clock.next_frame(), if ticking => {
                    self.frame_tick(t);
                }
            }

            self.publish();
            if self.shutdown_requested {
                break;
            }
        }

        info!("Scanner shutting down");
        self.unmount();
        self.publish();
    }

    /// Check for detection support, then enumerate cameras
    async fn initialize(&mut self) {
        match check_support(self.detectors.as_ref(), &self.config.symbologies) {
            Ok(detector) => self.detector = Some(detector),
            Err(ScanError::UnsupportedPlatform) => {
                self.session.supported = false;
                self.session.error = Some(ScanError::UnsupportedPlatform);
                self.ready = true;
                return;
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Scanner initialization halted");
                self.session.error = Some(e);
                self.ready = true;
                return;
            }
        }

        match self.devices.enumerate(self.media.as_ref()).await {
            Ok(devices) => {
                self.session.selected_device_id = select_default(devices).map(|d| d.id.clone());
                match &self.session.selected_device_id {
                    Some(id) => info!(device = %id, "Selected default camera"),
                    None => warn!("No cameras found"),
                }
            }
            Err(e) => self.session.error = Some(e),
        }

        self.ready = true;
    }

    /// Whether scanning can ever run in this session
    fn can_scan(&self) -> bool {
        self.session.supported
            && self.detector.is_some()
            && !self.session.error.as_ref().is_some_and(ScanError::is_terminal)
    }

    fn phase(&self) -> SessionPhase {
        if !self.session.supported {
            return SessionPhase::Unsupported;
        }
        match self.stream.state() {
            StreamState::Acquiring => SessionPhase::Acquiring,
            StreamState::Live => SessionPhase::Live,
            _ if self.session.error.is_some() => SessionPhase::Error,
            _ => SessionPhase::Idle,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            ready: self.ready,
            supported: self.session.supported,
            error: self.session.error.clone(),
            scanning: self.session.scanning,
            selected_device_id: self.session.selected_device_id.clone(),
            devices: self.devices.devices().to_vec(),
            switching_device: self.resume_at.is_some(),
            last_detection: self.last_detection.clone(),
            resolution: self.stream.resolution(),
        }
    }

    /// Publish the snapshot if anything changed
    fn publish(&self) {
        let next = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Release everything on the way out
    fn unmount(&mut self) {
        self.resume_at = None;
        self.halt_scanning();
        debug!("Scanner unmounted");
    }
}
