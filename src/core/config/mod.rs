mod parsing;
mod settings;
mod types;

pub use types::{
    ApiSettings, CameraSettings, ConfigError, Environment, ProctoringSettings, RuntimeSettings,
    SessionSettings, Settings, StoreSettings, TelemetrySettings,
};
