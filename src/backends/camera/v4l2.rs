// SPDX-License-Identifier: GPL-3.0-only

//! Native camera access through V4L2
//!
//! Enumerates `/dev/video*` nodes and captures frames with memory-mapped
//! buffers on a dedicated thread. Every frame is reduced to luma and
//! published into a single-slot buffer that the stream hands out on demand.

use super::format_converters::{LumaLayout, to_luma};
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::*;
use super::{MediaDevices, MediaStream};
use crate::constants::pipeline;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Latest decoded frame, shared between the capture thread and the stream
type FrameSlot = Arc<Mutex<Option<Frame>>>;

/// V4L2-backed [`MediaDevices`] implementation
#[derive(Debug, Default, Clone)]
pub struct V4l2MediaDevices;

impl V4l2MediaDevices {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaDevices for V4l2MediaDevices {
    async fn enumerate_devices(&self) -> PlatformResult<Vec<MediaDeviceInfo>> {
        tokio::task::spawn_blocking(enumerate_v4l2_devices)
            .await
            .map_err(|e| PlatformError::Io(format!("enumeration task failed: {e}")))?
    }

    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> PlatformResult<Box<dyn MediaStream>> {
        let constraints = constraints.clone();
        let stream = tokio::task::spawn_blocking(move || V4l2Stream::open(&constraints))
            .await
            .map_err(|e| PlatformError::Io(format!("acquisition task failed: {e}")))??;
        Ok(Box::new(stream))
    }
}

/// Enumerate V4L2 device nodes
///
/// Nodes that cannot be opened for reasons other than permissions are
/// skipped. If every node is inaccessible due to permissions the whole
/// enumeration fails so the user is told to grant camera access.
fn enumerate_v4l2_devices() -> PlatformResult<Vec<MediaDeviceInfo>> {
    if !Path::new("/dev").exists() {
        return Err(PlatformError::NotSupported(
            "no /dev directory for V4L2 devices".to_string(),
        ));
    }

    let nodes = v4l::context::enum_devices();
    let mut devices = Vec::with_capacity(nodes.len());
    let mut denied = 0usize;

    for node in &nodes {
        let path = node.path().to_string_lossy().to_string();

        let dev = match Device::with_path(node.path()) {
            Ok(dev) => dev,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                debug!(path = %path, "Permission denied opening V4L2 node");
                denied += 1;
                continue;
            }
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping V4L2 node");
                continue;
            }
        };

        let (kind, card) = match dev.query_caps() {
            Ok(caps) => {
                let kind = if caps
                    .capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                {
                    DeviceKind::VideoInput
                } else {
                    DeviceKind::Other
                };
                (kind, caps.card)
            }
            Err(e) => {
                debug!(path = %path, error = %e, "VIDIOC_QUERYCAP failed");
                continue;
            }
        };

        let label = node.name().unwrap_or(card);
        debug!(path = %path, label = %label, kind = ?kind, "Found V4L2 node");

        devices.push(MediaDeviceInfo {
            id: DeviceId::new(path),
            label,
            kind,
        });
    }

    if devices.is_empty() && denied > 0 {
        return Err(PlatformError::PermissionDenied(format!(
            "{denied} video device(s) not accessible"
        )));
    }

    Ok(devices)
}

/// Live V4L2 capture
pub struct V4l2Stream {
    device_id: DeviceId,
    resolution: (u32, u32),
    slot: FrameSlot,
    controller: Option<CaptureLoopController>,
}

/// State owned by the capture thread
struct CaptureState {
    stream: MmapStream<'static>,
    layout: LumaLayout,
    width: u32,
    height: u32,
    stride: u32,
    slot: FrameSlot,
    failures: u32,
    _device: Device,
}

/// Format negotiated during startup
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    layout: LumaLayout,
    width: u32,
    height: u32,
}

impl V4l2Stream {
    /// Open the device named by `constraints` and start capturing
    ///
    /// Blocks until the capture thread has opened the device and started
    /// streaming, or failed to.
    pub fn open(constraints: &StreamConstraints) -> PlatformResult<Self> {
        let device_id = constraints.device_id.value().clone();
        let requested_width = *constraints.width.value();
        let requested_height = *constraints.height.value();

        if *constraints.facing_mode.value() != FacingMode::Environment {
            debug!(facing = %constraints.facing_mode.value(), "V4L2 ignores facing mode");
        }

        info!(constraints = %constraints, "Opening V4L2 capture");

        let slot: FrameSlot = Arc::new(Mutex::new(None));
        let negotiated: Arc<Mutex<Option<Negotiated>>> = Arc::new(Mutex::new(None));

        let init_slot = Arc::clone(&slot);
        let init_negotiated = Arc::clone(&negotiated);
        let init_path = device_id.as_str().to_string();
        let exact_size = constraints.width.is_exact() || constraints.height.is_exact();

        let controller = CaptureLoopController::start_with_init(
            "v4l2-capture",
            move || {
                let state = open_capture(
                    &init_path,
                    requested_width,
                    requested_height,
                    exact_size,
                    init_slot,
                )?;
                if let Ok(mut n) = init_negotiated.lock() {
                    *n = Some(Negotiated {
                        layout: state.layout,
                        width: state.width,
                        height: state.height,
                    });
                }
                Ok(state)
            },
            capture_step,
        )?;

        let resolution = negotiated
            .lock()
            .ok()
            .and_then(|n| *n)
            .map(|n| {
                info!(
                    device = %device_id,
                    width = n.width,
                    height = n.height,
                    layout = ?n.layout,
                    "V4L2 capture started"
                );
                (n.width, n.height)
            })
            .unwrap_or((requested_width, requested_height));

        Ok(Self {
            device_id,
            resolution,
            slot,
            controller: Some(controller),
        })
    }
}

impl MediaStream for V4l2Stream {
    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn current_frame(&self) -> Option<Frame> {
        if self.controller.is_none() {
            return None;
        }
        self.slot.lock().ok()?.clone()
    }

    fn stop(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
            info!(device = %self.device_id, "V4L2 capture stopped");
        }
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }

    fn is_live(&self) -> bool {
        self.controller
            .as_ref()
            .map(|c| c.is_running())
            .unwrap_or(false)
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open, configure and start streaming (runs on the capture thread)
fn open_capture(
    path: &str,
    width: u32,
    height: u32,
    exact_size: bool,
    slot: FrameSlot,
) -> PlatformResult<CaptureState> {
    let dev = Device::with_path(path)?;

    let (layout, format) = negotiate_format(&dev, width, height)?;

    if exact_size && (format.width != width || format.height != height) {
        return Err(PlatformError::InvalidConfiguration(format!(
            "device delivers {}x{}, {}x{} required",
            format.width, format.height, width, height
        )));
    }

    let stream = MmapStream::with_buffers(&dev, Type::VideoCapture, pipeline::V4L2_BUFFER_COUNT)?;

    Ok(CaptureState {
        stream,
        layout,
        width: format.width,
        height: format.height,
        stride: format.stride,
        slot,
        failures: 0,
        _device: dev,
    })
}

/// Pick the first luma-convertible format the device accepts
fn negotiate_format(
    dev: &Device,
    width: u32,
    height: u32,
) -> PlatformResult<(LumaLayout, v4l::Format)> {
    let current = dev.format()?;

    for layout in LumaLayout::PREFERRED {
        let mut wanted = current;
        wanted.width = width;
        wanted.height = height;
        wanted.fourcc = v4l::FourCC::new(layout.fourcc());

        match dev.set_format(&wanted) {
            Ok(accepted) if LumaLayout::from_fourcc(&accepted.fourcc.repr) == Some(layout) => {
                debug!(
                    layout = ?layout,
                    width = accepted.width,
                    height = accepted.height,
                    "Negotiated V4L2 format"
                );
                return Ok((layout, accepted));
            }
            Ok(accepted) => {
                debug!(wanted = ?layout, got = ?accepted.fourcc, "Format not accepted");
            }
            Err(e) => {
                debug!(wanted = ?layout, error = %e, "Failed to set format");
            }
        }
    }

    // Nothing we asked for stuck; fall back to whatever is configured
    if let Some(layout) = LumaLayout::from_fourcc(&current.fourcc.repr) {
        warn!(layout = ?layout, "Using current device format");
        return Ok((layout, current));
    }

    Err(PlatformError::InvalidConfiguration(format!(
        "no supported pixel format (device uses {})",
        current.fourcc
    )))
}

/// One iteration of the capture loop
fn capture_step(state: &mut CaptureState) -> LoopAction {
    match state.stream.next() {
        Ok((buf, meta)) => {
            state.failures = 0;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };

            if let Some(luma) = to_luma(
                state.layout,
                &buf[..used],
                state.width,
                state.height,
                state.stride,
            ) {
                let frame = Frame::new(state.width, state.height, luma);
                if frame.is_valid()
                    && let Ok(mut slot) = state.slot.lock()
                {
                    *slot = Some(frame);
                }
            }
            LoopAction::Continue
        }
        Err(e) => {
            state.failures += 1;
            warn!(error = %e, failures = state.failures, "Failed to capture frame");
            if state.failures >= pipeline::MAX_CONSECUTIVE_CAPTURE_FAILURES {
                warn!("Too many capture failures, stopping capture loop");
                return LoopAction::Stop;
            }
            // Brief sleep before retry
            std::thread::sleep(Duration::from_millis(10));
            LoopAction::Continue
        }
    }
}
