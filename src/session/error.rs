use thiserror::Error;
use validator::ValidationErrors;

use crate::services::ServiceError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to load test: {0}")]
    Fetch(#[source] ServiceError),
    #[error("test definition is invalid: {0}")]
    InvalidTest(#[source] ValidationErrors),
    #[error("current user is invalid: {0}")]
    InvalidUser(#[source] ValidationErrors),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerRejected {
    #[error("question {index} does not exist (test has {total})")]
    UnknownQuestion { index: usize, total: usize },
    #[error("'{0}' is not one of the options")]
    NotAnOption(String),
    #[error("camera must be active before answering")]
    CameraNotReady,
    #[error("session is closed")]
    SessionClosed,
}
