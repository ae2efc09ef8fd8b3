use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) proctoring: ProctoringSettings,
    pub(super) session: SessionSettings,
    pub(super) store: StoreSettings,
    pub(super) camera: CameraSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

/// Violation limits. A warning is shown for every violation up to
/// `warn_threshold`; the session is terminated once the count reaches
/// `terminate_after`.
#[derive(Debug, Clone)]
pub struct ProctoringSettings {
    pub warn_threshold: u32,
    pub terminate_after: u32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tick_millis: u64,
    pub persist_debounce_millis: u64,
    pub time_critical_seconds: u64,
    pub home_route: String,
    pub notification_millis: u64,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: PathBuf,
    pub poll_millis: u64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid api url: {0}")]
    InvalidApiUrl(String),
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl SessionSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_millis)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_millis)
    }
}

impl CameraSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_millis)
    }
}
