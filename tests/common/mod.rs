// SPDX-License-Identifier: MPL-2.0

//! Fakes for the scanner's platform capabilities

#![allow(dead_code)]

use async_trait::async_trait;
use barcode_scanner::backends::camera::{
    DeviceId, Frame, MediaDeviceInfo, MediaDevices, MediaStream, PlatformError, PlatformResult,
    StreamConstraints,
};
use barcode_scanner::backends::clock::IntervalClock;
use barcode_scanner::backends::detector::{
    BarcodeDetector, DetectionResult, DetectorProvider, Symbology,
};
use barcode_scanner::scanner::{self, Platform};
use barcode_scanner::{Config, ScannerHandle, SessionSnapshot};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::time::Instant;

pub fn camera(id: &str, label: &str) -> MediaDeviceInfo {
    MediaDeviceInfo::video_input(id, label)
}

/// Stream bookkeeping shared between the fake devices and their streams
#[derive(Default)]
pub struct StreamCounters {
    pub enumerate_calls: AtomicUsize,
    pub acquire_calls: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub acquired: Mutex<Vec<(DeviceId, Instant)>>,
    pub released: Mutex<Vec<(DeviceId, Instant)>>,
    /// Open streams stop delivering frames, as when a camera is unplugged
    pub ended: AtomicBool,
}

impl StreamCounters {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    pub fn enumerate_calls(&self) -> usize {
        self.enumerate_calls.load(Ordering::SeqCst)
    }

    pub fn end_streams(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    pub fn acquired_ids(&self) -> Vec<DeviceId> {
        self.acquired
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

pub struct FakeMediaDevices {
    devices: Vec<MediaDeviceInfo>,
    enumerate_error: Option<PlatformError>,
    acquire_error: Mutex<Option<PlatformError>>,
    hang_acquire: AtomicBool,
    pub counters: Arc<StreamCounters>,
}

impl FakeMediaDevices {
    pub fn new(devices: Vec<MediaDeviceInfo>) -> Self {
        Self {
            devices,
            enumerate_error: None,
            acquire_error: Mutex::new(None),
            hang_acquire: AtomicBool::new(false),
            counters: Arc::new(StreamCounters::default()),
        }
    }

    pub fn failing_enumeration(error: PlatformError) -> Self {
        Self {
            enumerate_error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    /// Make every following acquisition fail (or succeed again with `None`)
    pub fn set_acquire_error(&self, error: Option<PlatformError>) {
        *self.acquire_error.lock().unwrap() = error;
    }

    /// Make following acquisitions never complete
    pub fn set_hang_acquire(&self, hang: bool) {
        self.hang_acquire.store(hang, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaDevices for FakeMediaDevices {
    async fn enumerate_devices(&self) -> PlatformResult<Vec<MediaDeviceInfo>> {
        self.counters.enumerate_calls.fetch_add(1, Ordering::SeqCst);
        match &self.enumerate_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.devices.clone()),
        }
    }

    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> PlatformResult<Box<dyn MediaStream>> {
        self.counters.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_acquire.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(e) = self.acquire_error.lock().unwrap().clone() {
            return Err(e);
        }

        let id = constraints.device_id.value().clone();
        if !self.devices.iter().any(|d| d.id == id) {
            return Err(PlatformError::DeviceNotFound(id.to_string()));
        }

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        self.counters
            .acquired
            .lock()
            .unwrap()
            .push((id.clone(), Instant::now()));

        Ok(Box::new(FakeStream {
            id,
            live: true,
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub struct FakeStream {
    id: DeviceId,
    live: bool,
    counters: Arc<StreamCounters>,
}

impl MediaStream for FakeStream {
    fn device_id(&self) -> &DeviceId {
        &self.id
    }

    fn resolution(&self) -> (u32, u32) {
        (8, 8)
    }

    fn current_frame(&self) -> Option<Frame> {
        self.is_live().then(|| Frame::new(8, 8, vec![128; 64]))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters
                .released
                .lock()
                .unwrap()
                .push((self.id.clone(), Instant::now()));
        }
    }

    fn is_live(&self) -> bool {
        self.live && !self.counters.ended.load(Ordering::SeqCst)
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Detector that replays scripted results, then reports nothing found
pub struct ScriptedDetector {
    script: Mutex<VecDeque<PlatformResult<Vec<DetectionResult>>>>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            gate: None,
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    /// Every call waits for `gate` before returning
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn then(self, result: PlatformResult<Vec<DetectionResult>>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn then_empty(self) -> Self {
        self.then(Ok(Vec::new()))
    }

    pub fn then_found(self, results: Vec<DetectionResult>) -> Self {
        self.then(Ok(results))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl BarcodeDetector for ScriptedDetector {
    async fn detect(&self, _frame: &Frame) -> PlatformResult<Vec<DetectionResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    fn formats(&self) -> &[Symbology] {
        &Symbology::RETAIL
    }
}

pub struct FakeDetectorProvider {
    supported: bool,
    fail_create: bool,
    detector: Arc<ScriptedDetector>,
}

impl FakeDetectorProvider {
    pub fn new(detector: Arc<ScriptedDetector>) -> Self {
        Self {
            supported: true,
            fail_create: false,
            detector,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Arc::new(ScriptedDetector::new()))
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new(Arc::new(ScriptedDetector::new()))
        }
    }
}

impl DetectorProvider for FakeDetectorProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn supported_formats(&self) -> Vec<Symbology> {
        Symbology::ALL.to_vec()
    }

    fn create(&self, _formats: &[Symbology]) -> PlatformResult<Arc<dyn BarcodeDetector>> {
        if self.fail_create {
            return Err(PlatformError::InvalidConfiguration(
                "decoder unavailable".to_string(),
            ));
        }
        Ok(self.detector.clone())
    }
}

/// A running scanner wired to fakes
pub struct Harness {
    pub handle: ScannerHandle,
    pub media: Arc<FakeMediaDevices>,
    pub detected: Arc<Mutex<Vec<String>>>,
    /// `scanning` as seen by the callback through the snapshot channel
    pub scanning_in_callback: Arc<Mutex<Vec<bool>>>,
}

impl Harness {
    pub fn start(media: FakeMediaDevices, provider: FakeDetectorProvider) -> Self {
        let media = Arc::new(media);
        let detected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&detected);
        let scanning_in_callback = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&scanning_in_callback);
        let snapshots: Arc<OnceLock<watch::Receiver<SessionSnapshot>>> = Arc::new(OnceLock::new());
        let snapshots_in_callback = Arc::clone(&snapshots);

        let platform = Platform {
            media: media.clone(),
            detectors: Arc::new(provider),
            clock: Box::new(IntervalClock::with_rate(60)),
        };
        let handle = scanner::spawn(
            platform,
            Config::default(),
            Box::new(move |code| {
                if let Some(rx) = snapshots_in_callback.get() {
                    seen.lock().unwrap().push(rx.borrow().scanning);
                }
                sink.lock().unwrap().push(code);
            }),
        );
        let _ = snapshots.set(handle.subscribe());

        Self {
            handle,
            media,
            detected,
            scanning_in_callback,
        }
    }

    pub fn counters(&self) -> &StreamCounters {
        &self.media.counters
    }

    pub fn detected(&self) -> Vec<String> {
        self.detected.lock().unwrap().clone()
    }

    /// Wait (in virtual time) for the snapshot to match
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        tokio::time::timeout(Duration::from_secs(10), self.handle.wait_for(predicate))
            .await
            .expect("timed out waiting for scanner state")
            .expect("scanner closed")
    }

    pub async fn wait_ready(&self) -> SessionSnapshot {
        self.wait_for(|s| s.ready).await
    }
}

/// Poll until `condition` holds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}
