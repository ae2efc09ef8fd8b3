use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FullscreenError {
    #[error("fullscreen request rejected: {0}")]
    Rejected(String),
    #[error("fullscreen is not supported here")]
    Unsupported,
}

#[async_trait]
pub trait Fullscreen: Send + Sync {
    async fn request_fullscreen(&self) -> Result<(), FullscreenError>;
}

/// Terminals have no fullscreen API; every request is declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalFullscreen;

#[async_trait]
impl Fullscreen for TerminalFullscreen {
    async fn request_fullscreen(&self) -> Result<(), FullscreenError> {
        Err(FullscreenError::Unsupported)
    }
}
