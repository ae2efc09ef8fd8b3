use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::Settings;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device available: {0}")]
    NoDevice(String),
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// Source of live video streams.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live capture stream. `stop` ends every track; stopping does not count as
/// an unexpected end.
pub trait MediaStream: Send {
    fn live_tracks(&self) -> usize;

    fn stop(&mut self);

    /// Flips to `true` when the video track ends without `stop` being called.
    fn track_ended(&self) -> watch::Receiver<bool>;
}

/// Exclusive ownership of the session's stream. Dropping the handle releases
/// the camera, so every exit path ends with zero live tracks.
pub struct CameraHandle {
    stream: Option<Box<dyn MediaStream>>,
}

impl CameraHandle {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self { stream: Some(stream) }
    }

    pub fn empty() -> Self {
        Self { stream: None }
    }

    pub fn is_live(&self) -> bool {
        self.stream.as_ref().is_some_and(|stream| stream.live_tracks() > 0)
    }

    pub fn track_ended(&self) -> Option<watch::Receiver<bool>> {
        self.stream.as_ref().map(|stream| stream.track_ended())
    }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("Camera released");
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Camera backed by a video device node. Holding the open device is the
/// capture; the device disappearing ends the track.
#[derive(Debug, Clone)]
pub struct DeviceCamera {
    device: PathBuf,
    poll_interval: Duration,
}

impl DeviceCamera {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.camera().device.clone(), settings.camera().poll_interval())
    }

    pub fn new(device: PathBuf, poll_interval: Duration) -> Self {
        Self { device, poll_interval }
    }
}

#[async_trait]
impl Camera for DeviceCamera {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>, CameraError> {
        let file = tokio::fs::File::open(&self.device).await.map_err(|err| match err.kind() {
            ErrorKind::PermissionDenied => CameraError::PermissionDenied,
            ErrorKind::NotFound => CameraError::NoDevice(self.device.display().to_string()),
            _ => CameraError::Unavailable(err.to_string()),
        })?;

        let (ended_tx, ended_rx) = watch::channel(false);
        let device = self.device.clone();
        let poll_interval = self.poll_interval;
        let monitor = tokio::spawn(async move {
            let mut tick = tokio::time::interval(poll_interval);
            loop {
                tick.tick().await;
                if tokio::fs::metadata(&device).await.is_err() {
                    tracing::warn!(device = %device.display(), "Camera device disappeared");
                    let _ = ended_tx.send(true);
                    break;
                }
            }
        });

        tracing::info!(device = %self.device.display(), "Camera acquired");
        Ok(Box::new(DeviceStream { file: Some(file), ended: ended_rx, monitor }))
    }
}

struct DeviceStream {
    file: Option<tokio::fs::File>,
    ended: watch::Receiver<bool>,
    monitor: JoinHandle<()>,
}

impl MediaStream for DeviceStream {
    fn live_tracks(&self) -> usize {
        usize::from(self.file.is_some() && !*self.ended.borrow())
    }

    fn stop(&mut self) {
        self.monitor.abort();
        self.file = None;
    }

    fn track_ended(&self) -> watch::Receiver<bool> {
        self.ended.clone()
    }
}

impl Drop for DeviceStream {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}
