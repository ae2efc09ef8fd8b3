use std::path::PathBuf;

use super::parsing::{
    env_optional, env_or_default, normalize_api_url, parse_bool, parse_environment, parse_u32,
    parse_u64,
};
use super::types::{
    ApiSettings, CameraSettings, ConfigError, ProctoringSettings, RuntimeSettings,
    SessionSettings, Settings, StoreSettings, TelemetrySettings,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("PROCTOR_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PROCTOR_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = normalize_api_url(&env_or_default("PROCTOR_API_URL", ""))?;
        let request_timeout_seconds = parse_u64(
            "PROCTOR_HTTP_TIMEOUT_SECONDS",
            env_or_default("PROCTOR_HTTP_TIMEOUT_SECONDS", "30"),
        )?;
        let connect_timeout_seconds = parse_u64(
            "PROCTOR_HTTP_CONNECT_TIMEOUT_SECONDS",
            env_or_default("PROCTOR_HTTP_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;

        let warn_threshold =
            parse_u32("PROCTOR_WARN_THRESHOLD", env_or_default("PROCTOR_WARN_THRESHOLD", "3"))?;
        let terminate_after =
            parse_u32("PROCTOR_TERMINATE_AFTER", env_or_default("PROCTOR_TERMINATE_AFTER", "4"))?;

        let tick_millis =
            parse_u64("PROCTOR_TICK_MILLIS", env_or_default("PROCTOR_TICK_MILLIS", "1000"))?;
        let persist_debounce_millis = parse_u64(
            "PROCTOR_PERSIST_DEBOUNCE_MILLIS",
            env_or_default("PROCTOR_PERSIST_DEBOUNCE_MILLIS", "16"),
        )?;
        let time_critical_seconds = parse_u64(
            "PROCTOR_TIME_CRITICAL_SECONDS",
            env_or_default("PROCTOR_TIME_CRITICAL_SECONDS", "300"),
        )?;
        let home_route = env_or_default("PROCTOR_HOME_ROUTE", "/student-home");
        let notification_millis = parse_u64(
            "PROCTOR_NOTIFICATION_MILLIS",
            env_or_default("PROCTOR_NOTIFICATION_MILLIS", "3000"),
        )?;

        let state_dir = PathBuf::from(env_or_default("PROCTOR_STATE_DIR", ".proctor-state"));
        let device = PathBuf::from(env_or_default("PROCTOR_CAMERA_DEVICE", "/dev/video0"));
        let poll_millis = parse_u64(
            "PROCTOR_CAMERA_POLL_MILLIS",
            env_or_default("PROCTOR_CAMERA_POLL_MILLIS", "1000"),
        )?;

        let log_level = env_or_default("PROCTOR_LOG_LEVEL", "info");
        let json = env_optional("PROCTOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let metrics_enabled =
            env_optional("PROCTOR_METRICS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { base_url, request_timeout_seconds, connect_timeout_seconds },
            proctoring: ProctoringSettings { warn_threshold, terminate_after },
            session: SessionSettings {
                tick_millis,
                persist_debounce_millis,
                time_critical_seconds,
                home_route,
                notification_millis,
            },
            store: StoreSettings { state_dir },
            camera: CameraSettings { device, poll_millis },
            telemetry: TelemetrySettings { log_level, json, metrics_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub fn proctoring(&self) -> &ProctoringSettings {
        &self.proctoring
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub fn store(&self) -> &StoreSettings {
        &self.store
    }

    pub fn camera(&self) -> &CameraSettings {
        &self.camera
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.proctoring.warn_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PROCTOR_WARN_THRESHOLD",
                value: self.proctoring.warn_threshold.to_string(),
            });
        }
        if self.proctoring.terminate_after <= self.proctoring.warn_threshold {
            return Err(ConfigError::InvalidValue {
                field: "PROCTOR_TERMINATE_AFTER",
                value: self.proctoring.terminate_after.to_string(),
            });
        }
        if self.session.tick_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PROCTOR_TICK_MILLIS",
                value: String::from("0"),
            });
        }
        if self.runtime.strict_config && !self.api.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidApiUrl(self.api.base_url.clone()));
        }
        Ok(())
    }
}
