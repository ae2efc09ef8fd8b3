use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::core::config::ApiSettings;

pub mod proctoring_log;
pub mod store;
pub mod test_service;

pub use proctoring_log::{HttpProctoringLog, ProctoringLog};
pub use store::{FileStore, MemoryStore, SessionStore, StoreError};
pub use test_service::{HttpTestService, TestService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("test {0} not found")]
    NotFound(String),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{0}")]
    Rejected(String),
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
    #[error("invalid service url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ServiceError {
    pub(crate) fn transport(endpoint: &str, source: reqwest::Error) -> Self {
        Self::Transport { endpoint: endpoint.to_string(), source }
    }

    /// Network-level failure as opposed to an answer from the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Transport { .. })
    }
}

pub(crate) fn build_http_client(api: &ApiSettings) -> anyhow::Result<Client> {
    use anyhow::Context;

    Client::builder()
        .connect_timeout(Duration::from_secs(api.connect_timeout_seconds))
        .timeout(Duration::from_secs(api.request_timeout_seconds))
        .build()
        .context("Failed to build HTTP client")
}
