// SPDX-License-Identifier: GPL-3.0-only

//! Live stream ownership
//!
//! The manager holds at most one [`MediaStream`]. Every path out of `Live`
//! goes through [`StreamManager::teardown`], which stops the tracks before
//! the stream is dropped, so a new acquisition never overlaps an old one.

use crate::backends::camera::{DeviceId, Frame, MediaDevices, MediaStream, StreamConstraints};
use crate::errors::ScanError;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Stream lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Acquiring,
    Live,
    Error,
}

pub struct StreamManager {
    media: Arc<dyn MediaDevices>,
    stream: Option<Box<dyn MediaStream>>,
    state: StreamState,
    /// Preview sink the live stream is bound to
    sink: watch::Sender<Option<Frame>>,
    ideal_size: (u32, u32),
}

impl StreamManager {
    pub fn new(
        media: Arc<dyn MediaDevices>,
        sink: watch::Sender<Option<Frame>>,
        ideal_width: u32,
        ideal_height: u32,
    ) -> Self {
        Self {
            media,
            stream: None,
            state: StreamState::Idle,
            sink,
            ideal_size: (ideal_width, ideal_height),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == StreamState::Live
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.stream.as_ref().map(|s| s.resolution())
    }

    /// Release any current stream and enter `Acquiring` for `device`
    pub fn begin_acquire(&mut self, device: &DeviceId) -> StreamConstraints {
        self.teardown();
        self.state = StreamState::Acquiring;
        let (width, height) = self.ideal_size;
        StreamConstraints::for_device(device.clone(), width, height)
    }

    /// Open the stream described by `constraints`
    pub async fn acquire(&mut self, constraints: StreamConstraints) -> Result<(), ScanError> {
        debug_assert!(self.stream.is_none());
        self.state = StreamState::Acquiring;

        match self.media.acquire_stream(&constraints).await {
            Ok(stream) => {
                let (width, height) = stream.resolution();
                info!(device = %stream.device_id(), width, height, "Camera stream live");
                self.stream = Some(stream);
                self.state = StreamState::Live;
                self.present();
                Ok(())
            }
            Err(e) => {
                warn!(constraints = %constraints, error = %e, "Failed to acquire camera stream");
                self.state = StreamState::Error;
                Err(ScanError::PermissionOrDevice(e.to_string()))
            }
        }
    }

    /// Latest frame from the live stream
    pub fn current_frame(&self) -> Option<Frame> {
        if self.state != StreamState::Live {
            return None;
        }
        self.stream.as_ref()?.current_frame()
    }

    /// Push the latest frame to the preview sink
    ///
    /// Returns the frame so callers can reuse it.
    pub fn present(&self) -> Option<Frame> {
        let frame = self.current_frame()?;
        let next = frame.clone();
        self.sink.send_if_modified(|current| {
            let changed = current
                .as_ref()
                .is_none_or(|c| c.captured_at != next.captured_at);
            if changed {
                *current = Some(next);
            }
            changed
        });
        Some(frame)
    }

    /// Stop every track and release the stream
    ///
    /// A stream whose tracks already ended is released the same way.
    pub fn teardown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if !stream.is_live() {
                debug!(device = %stream.device_id(), "Stream already ended");
            }
            stream.stop();
            info!(device = %stream.device_id(), "Camera stream released");
        }
        if self.state != StreamState::Error {
            self.state = StreamState::Idle;
        }
        self.sink.send_replace(None);
    }

    /// Whether the manager is `Live` but the platform stream stopped delivering
    ///
    /// Happens when a camera is unplugged or its capture thread gives up.
    pub fn has_ended(&self) -> bool {
        self.state == StreamState::Live && self.stream.as_ref().is_some_and(|s| !s.is_live())
    }

    /// Release an ended stream and enter `Error`
    pub fn fail(&mut self) {
        self.teardown();
        self.state = StreamState::Error;
    }

    /// Forget a previous acquisition failure
    pub fn reset(&mut self) {
        if self.state == StreamState::Error {
            self.state = StreamState::Idle;
        }
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!("StreamManager dropped, releasing stream");
            self.teardown();
        }
    }
}
