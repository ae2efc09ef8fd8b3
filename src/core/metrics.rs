use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;
use crate::session::{SubmissionTrigger, ViolationKind};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().metrics_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_violation(kind: ViolationKind) {
    metrics::counter!("proctor_violations_total", "kind" => kind.as_str()).increment(1);
}

pub(crate) fn record_submission(trigger: SubmissionTrigger, outcome: &'static str) {
    metrics::counter!(
        "proctor_submissions_total",
        "trigger" => trigger.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub(crate) fn record_termination(kind: ViolationKind) {
    metrics::counter!("proctor_terminations_total", "kind" => kind.as_str()).increment(1);
}

pub(crate) fn record_report_failure() {
    metrics::counter!("proctor_violation_reports_failed_total").increment(1);
}

pub(crate) fn set_seconds_remaining(seconds: u64) {
    metrics::gauge!("proctor_seconds_remaining").set(seconds as f64);
}
