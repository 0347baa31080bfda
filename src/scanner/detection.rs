// SPDX-License-Identifier: GPL-3.0-only

//! Throttled detection loop
//!
//! Each frame tick may start one detection attempt. Attempts are spaced by
//! at least the configured interval and never overlap. Cancelling the loop
//! drops the pending attempt and flips the cancellation flag it captured, so
//! a result that still arrives is discarded.

use crate::backends::camera::{Frame, PlatformError};
use crate::backends::detector::{BarcodeDetector, DetectionResult};
use crate::errors::ScanError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// A detection call that has not resolved yet
struct PendingAttempt {
    future: BoxFuture<'static, Result<Vec<DetectionResult>, PlatformError>>,
    cancel_flag: Arc<AtomicBool>,
    started_at: Duration,
}

/// Resolved detection call
pub struct AttemptOutcome {
    result: Result<Vec<DetectionResult>, PlatformError>,
    cancel_flag: Arc<AtomicBool>,
    started_at: Duration,
}

/// What the session should do with an [`AttemptOutcome`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Loop was cancelled after the attempt started
    Discarded,
    /// Nothing decoded; keep going
    Empty,
    /// Attempt failed; keep going
    Failed(ScanError),
    /// First decoded barcode
    Detected(DetectionResult),
}

pub struct DetectionLoop {
    interval: Duration,
    last_detection: Duration,
    active: bool,
    cancel_flag: Arc<AtomicBool>,
    pending: Option<PendingAttempt>,
    attempts: u64,
}

impl DetectionLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_detection: Duration::ZERO,
            active: false,
            cancel_flag: Arc::new(AtomicBool::new(true)),
            pending: None,
            attempts: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of attempts started since creation
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Begin a new run with a fresh cancellation flag
    pub fn start(&mut self) {
        self.cancel();
        self.cancel_flag = Arc::new(AtomicBool::new(false));
        self.last_detection = Duration::ZERO;
        self.active = true;
        debug!(interval_ms = self.interval.as_millis(), "Detection loop started");
    }

    /// Stop the run and drop any pending attempt
    pub fn cancel(&mut self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        if self.pending.take().is_some() {
            debug!("Dropped in-flight detection attempt");
        }
        if self.active {
            debug!(attempts = self.attempts, "Detection loop cancelled");
        }
        self.active = false;
    }

    /// Whether a tick at `t` may start an attempt
    pub fn should_attempt(&self, t: Duration) -> bool {
        self.active && self.pending.is_none() && t > self.last_detection + self.interval
    }

    /// Handle a frame tick, starting an attempt when allowed
    ///
    /// Returns true if an attempt was started.
    pub fn on_tick(
        &mut self,
        t: Duration,
        frame: Option<Frame>,
        detector: &Arc<dyn BarcodeDetector>,
    ) -> bool {
        if !self.should_attempt(t) {
            return false;
        }
        let Some(frame) = frame else {
            trace!("No frame available yet");
            return false;
        };
        self.begin_attempt(t, frame, Arc::clone(detector));
        true
    }

    fn begin_attempt(&mut self, t: Duration, frame: Frame, detector: Arc<dyn BarcodeDetector>) {
        self.last_detection = t;
        self.attempts += 1;
        trace!(t_ms = t.as_millis(), attempt = self.attempts, "Starting detection attempt");

        let future = async move { detector.detect(&frame).await }.boxed();
        self.pending = Some(PendingAttempt {
            future,
            cancel_flag: Arc::clone(&self.cancel_flag),
            started_at: t,
        });
    }

    /// Wait for the pending attempt to resolve
    ///
    /// Never resolves when nothing is pending. Dropping the returned future
    /// leaves the attempt pending.
    pub async fn next_outcome(&mut self) -> AttemptOutcome {
        let Some(pending) = self.pending.as_mut() else {
            return std::future::pending().await;
        };
        let result = (&mut pending.future).await;
        let cancel_flag = Arc::clone(&pending.cancel_flag);
        let started_at = pending.started_at;
        self.pending = None;
        AttemptOutcome {
            result,
            cancel_flag,
            started_at,
        }
    }

    /// Classify a resolved attempt
    pub fn resolve(&mut self, outcome: AttemptOutcome) -> Resolution {
        if outcome.cancel_flag.load(Ordering::SeqCst) || !self.active {
            trace!(started_ms = outcome.started_at.as_millis(), "Discarding cancelled attempt");
            return Resolution::Discarded;
        }

        match outcome.result {
            Ok(results) => match results.into_iter().next() {
                Some(first) => Resolution::Detected(first),
                None => Resolution::Empty,
            },
            Err(e) => Resolution::Failed(ScanError::TransientDetection(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::PlatformResult;
    use crate::backends::detector::Symbology;
    use async_trait::async_trait;

    struct FixedDetector(Vec<DetectionResult>);

    #[async_trait]
    impl BarcodeDetector for FixedDetector {
        async fn detect(&self, _frame: &Frame) -> PlatformResult<Vec<DetectionResult>> {
            Ok(self.0.clone())
        }

        fn formats(&self) -> &[Symbology] {
            &Symbology::RETAIL
        }
    }

    fn frame() -> Option<Frame> {
        Some(Frame::new(2, 2, vec![0; 4]))
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_throttle_is_strict() {
        let mut detection = DetectionLoop::new(ms(200));
        assert!(!detection.should_attempt(ms(500)));

        detection.start();
        assert!(!detection.should_attempt(ms(200)));
        assert!(detection.should_attempt(ms(201)));
    }

    #[tokio::test]
    async fn test_one_attempt_in_flight() {
        let detector: Arc<dyn BarcodeDetector> = Arc::new(FixedDetector(Vec::new()));
        let mut detection = DetectionLoop::new(ms(200));
        detection.start();

        assert!(detection.on_tick(ms(300), frame(), &detector));
        assert!(!detection.on_tick(ms(900), frame(), &detector));

        let outcome = detection.next_outcome().await;
        assert_eq!(detection.resolve(outcome), Resolution::Empty);

        // Spacing is measured from the last attempt
        assert!(!detection.on_tick(ms(500), frame(), &detector));
        assert!(detection.on_tick(ms(501), frame(), &detector));
    }

    #[tokio::test]
    async fn test_first_result_wins() {
        let detector: Arc<dyn BarcodeDetector> = Arc::new(FixedDetector(vec![
            DetectionResult::new("012345678905", Symbology::UpcA),
            DetectionResult::new("96385074", Symbology::Ean8),
        ]));
        let mut detection = DetectionLoop::new(ms(200));
        detection.start();
        detection.on_tick(ms(250), frame(), &detector);

        let outcome = detection.next_outcome().await;
        assert_eq!(
            detection.resolve(outcome),
            Resolution::Detected(DetectionResult::new("012345678905", Symbology::UpcA))
        );
    }

    #[tokio::test]
    async fn test_cancel_discards_outcome() {
        let detector: Arc<dyn BarcodeDetector> = Arc::new(FixedDetector(vec![
            DetectionResult::new("4006381333931", Symbology::Ean13),
        ]));
        let mut detection = DetectionLoop::new(ms(200));
        detection.start();
        detection.on_tick(ms(250), frame(), &detector);

        let outcome = detection.next_outcome().await;
        detection.cancel();
        assert_eq!(detection.resolve(outcome), Resolution::Discarded);
        assert!(!detection.has_pending());
    }

    #[test]
    fn test_restart_resets_last_detection() {
        let detector: Arc<dyn BarcodeDetector> = Arc::new(FixedDetector(Vec::new()));
        let mut detection = DetectionLoop::new(ms(200));
        detection.start();
        assert!(detection.on_tick(ms(1000), frame(), &detector));

        detection.cancel();
        assert!(!detection.has_pending());
        detection.start();
        assert!(detection.should_attempt(ms(201)));
    }

    #[test]
    fn test_missing_frame_does_not_consume_slot() {
        let detector: Arc<dyn BarcodeDetector> = Arc::new(FixedDetector(Vec::new()));
        let mut detection = DetectionLoop::new(ms(200));
        detection.start();
        assert!(!detection.on_tick(ms(300), None, &detector));
        assert!(detection.on_tick(ms(301), frame(), &detector));
        assert_eq!(detection.attempts(), 1);
    }
}
