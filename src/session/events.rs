use std::time::Duration;

use uuid::Uuid;

use crate::schemas::submission::Answers;
use crate::session::countdown::CountdownState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
    Info,
}

/// Dismissible toast. `duration` of `None` keeps it until closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub level: NotificationLevel,
    pub duration: Option<Duration>,
    pub closable: bool,
}

impl Notification {
    pub fn transient(level: NotificationLevel, message: impl Into<String>, duration: Duration) -> Self {
        Self { id: Uuid::new_v4(), message: message.into(), level, duration: Some(duration), closable: true }
    }

    pub fn persistent(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), message: message.into(), level, duration: None, closable: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Notify(Notification),
    Navigate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingCamera,
    CameraBlocked,
    Active,
    Submitting,
    Submitted,
    SubmitFailed,
    Cancelled,
    Unmounted,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Submitted
                | SessionPhase::SubmitFailed
                | SessionPhase::Cancelled
                | SessionPhase::Unmounted
        )
    }

    /// Leaving now would abandon an exam in progress.
    pub fn guards_leave(self) -> bool {
        matches!(
            self,
            SessionPhase::AwaitingCamera | SessionPhase::CameraBlocked | SessionPhase::Active
        )
    }
}

/// Read-only picture of the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub test_id: String,
    pub test_name: String,
    pub seconds_remaining: u64,
    pub countdown: CountdownState,
    pub clock: String,
    pub time_critical: bool,
    pub violation_count: u32,
    pub answers: Answers,
    pub camera_ready: bool,
    pub blocking_message: Option<String>,
}
