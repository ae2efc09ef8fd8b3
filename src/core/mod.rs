pub mod config;
pub(crate) mod metrics;
pub(crate) mod shutdown;
pub(crate) mod telemetry;
pub mod time;
