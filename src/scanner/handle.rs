// SPDX-License-Identifier: GPL-3.0-only

//! Host-side handle to a running scanner task

use super::state::{ScannerMessage, SessionSnapshot};
use crate::backends::camera::Frame;
use crate::errors::{AppError, AppResult};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Controls a scanner task and observes its state
///
/// Dropping the handle closes the command channel, which unmounts the
/// scanner and releases the camera.
pub struct ScannerHandle {
    commands: mpsc::Sender<ScannerMessage>,
    snapshot: watch::Receiver<SessionSnapshot>,
    preview: watch::Receiver<Option<Frame>>,
    task: Option<JoinHandle<()>>,
}

impl ScannerHandle {
    pub(super) fn new(
        commands: mpsc::Sender<ScannerMessage>,
        snapshot: watch::Receiver<SessionSnapshot>,
        preview: watch::Receiver<Option<Frame>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            snapshot,
            preview,
            task: Some(task),
        }
    }

    /// Queue a message without waiting (for synchronous UI handlers)
    pub fn dispatch(&self, message: ScannerMessage) -> AppResult<()> {
        self.commands.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(message) => {
                warn!(message = ?message, "Scanner command queue full, dropping message");
                AppError::Other("scanner is busy".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => AppError::ScannerClosed,
        })
    }

    /// Queue a message, waiting for room in the channel
    pub async fn send(&self, message: ScannerMessage) -> AppResult<()> {
        self.commands
            .send(message)
            .await
            .map_err(|_| AppError::ScannerClosed)
    }

    /// Current session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Receiver for preview frames; `None` while no stream is live
    pub fn preview(&self) -> watch::Receiver<Option<Frame>> {
        self.preview.clone()
    }

    /// Wait until the session state satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> AppResult<SessionSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| AppError::ScannerClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop scanning, release the camera and wait for the task to end
    pub async fn shutdown(mut self) -> AppResult<()> {
        if self.commands.send(ScannerMessage::Shutdown).await.is_err() {
            debug!("Scanner task already gone");
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| AppError::Other(format!("scanner task failed: {e}")))?;
        }
        Ok(())
    }
}
