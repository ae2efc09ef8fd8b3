pub mod core;
pub mod platform;
pub mod schemas;
pub mod services;
pub mod session;
pub(crate) mod terminal;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::core::{config::Settings, telemetry};
use crate::platform::{DeviceCamera, TerminalFullscreen};
use crate::schemas::user::CurrentUser;
use crate::services::{FileStore, HttpProctoringLog, HttpTestService};
use crate::session::{SessionConfig, SessionController, SessionDeps, SessionOutcome};

#[derive(Parser, Debug)]
#[command(name = "proctor-client", about = "Take a proctored exam from the terminal")]
struct Cli {
    /// Test to take.
    #[arg(long)]
    test_id: String,
    /// JSON file with the signed-in user; falls back to PROCTOR_USER.
    #[arg(long)]
    user: Option<PathBuf>,
}

fn load_user(path: Option<&PathBuf>) -> anyhow::Result<CurrentUser> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read user file {}", path.display()))?,
        None => std::env::var("PROCTOR_USER")
            .context("No user given: pass --user <file> or set PROCTOR_USER")?,
    };
    serde_json::from_str(&raw).context("Failed to parse user JSON")
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let user = load_user(cli.user.as_ref())?;
    let deps = SessionDeps {
        tests: Arc::new(HttpTestService::from_settings(&settings)?),
        proctoring_log: Arc::new(HttpProctoringLog::from_settings(&settings)?),
        store: Arc::new(FileStore::from_settings(&settings)),
        camera: Arc::new(DeviceCamera::from_settings(&settings)),
        fullscreen: Arc::new(TerminalFullscreen),
    };
    let controller = SessionController::new(deps, SessionConfig::from_settings(&settings));

    tracing::info!(
        environment = %settings.runtime().environment.as_str(),
        api = %settings.api().base_url,
        test_id = %cli.test_id,
        "Starting proctored exam"
    );

    let (handle, ui) = controller.start(user, &cli.test_id).await?;
    let outcome = terminal::drive(handle, ui).await;

    match &outcome {
        SessionOutcome::Submitted { trigger, .. } => {
            tracing::info!(trigger = trigger.as_str(), "Exam finished");
        }
        SessionOutcome::SubmitFailed { reason, .. } => {
            tracing::warn!(reason = %reason, "Exam not submitted, progress kept for retry");
        }
        SessionOutcome::Cancelled => tracing::info!("Exam cancelled"),
        SessionOutcome::Unmounted => tracing::info!("Exam paused, progress kept"),
    }

    Ok(())
}
