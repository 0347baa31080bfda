// SPDX-License-Identifier: GPL-3.0-only

//! Frame callback timing
//!
//! The detection loop runs once per display frame, the way a UI would
//! schedule work on its next repaint. [`FrameClock`] yields a monotonic
//! timestamp measured from the clock's origin on every frame.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Source of frame callbacks
#[async_trait]
pub trait FrameClock: Send {
    /// Wait for the next frame and return the time since the clock origin
    async fn next_frame(&mut self) -> Duration;
}

/// [`FrameClock`] driven by a tokio interval
///
/// The interval is created on the first call so the clock can be built
/// outside a runtime. Frames missed while the loop was busy are skipped
/// rather than delivered in a burst.
pub struct IntervalClock {
    period: Duration,
    origin: Option<Instant>,
    interval: Option<Interval>,
}

impl IntervalClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            origin: None,
            interval: None,
        }
    }

    /// Clock ticking `hz` times per second
    pub fn with_rate(hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / hz.max(1))
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::with_rate(crate::constants::timing::FRAME_RATE_HZ)
    }
}

#[async_trait]
impl FrameClock for IntervalClock {
    async fn next_frame(&mut self) -> Duration {
        let period = self.period;
        let origin = *self.origin.get_or_insert_with(Instant::now);
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        interval.tick().await;
        Instant::now().duration_since(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_spaced_by_period() {
        let mut clock = IntervalClock::new(Duration::from_millis(16));

        let first = clock.next_frame().await;
        let second = clock.next_frame().await;
        let third = clock.next_frame().await;

        assert_eq!(first, Duration::ZERO);
        assert_eq!(second - first, Duration::from_millis(16));
        assert_eq!(third - second, Duration::from_millis(16));
    }

    #[test]
    fn test_rate_to_period() {
        assert_eq!(IntervalClock::with_rate(50).period(), Duration::from_millis(20));
        // Zero rate is clamped instead of dividing by zero
        assert_eq!(IntervalClock::with_rate(0).period(), Duration::from_secs(1));
    }
}
