use async_trait::async_trait;
use reqwest::Client;

use super::ServiceError;
use crate::core::config::Settings;
use crate::schemas::submission::CheatingReport;

/// Receives termination records. Callers treat it as best effort.
#[async_trait]
pub trait ProctoringLog: Send + Sync {
    async fn report(&self, report: &CheatingReport) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct HttpProctoringLog {
    client: Client,
    endpoint: String,
}

impl HttpProctoringLog {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = super::build_http_client(settings.api())?;
        Ok(Self::new(client, &settings.api().base_url))
    }

    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, endpoint: format!("{}/cheating", base_url.trim_end_matches('/')) }
    }
}

#[async_trait]
impl ProctoringLog for HttpProctoringLog {
    async fn report(&self, report: &CheatingReport) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .map_err(|err| ServiceError::transport(&self.endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        tracing::info!(
            student_id = %report.student_id,
            test_id = %report.test_id,
            event = report.event.as_str(),
            "Termination reported to proctoring log"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    use super::*;
    use crate::session::ViolationKind;

    async fn spawn_server(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/cheating",
                post(
                    move |State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        received.lock().await.push(body);
                        status
                    },
                ),
            )
            .with_state(received.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), received)
    }

    fn report() -> CheatingReport {
        CheatingReport {
            student_id: "u-1".to_string(),
            test_id: "t-1".to_string(),
            event: ViolationKind::FullscreenExit,
        }
    }

    #[tokio::test]
    async fn report_posts_termination_record() {
        let (base, received) = spawn_server(StatusCode::CREATED).await;
        let log = HttpProctoringLog::new(Client::new(), &base);

        log.report(&report()).await.expect("report");

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["studentId"], "u-1");
        assert_eq!(received[0]["testId"], "t-1");
        assert_eq!(received[0]["event"], "fullscreen-exit");
    }

    #[tokio::test]
    async fn report_fails_on_server_error() {
        let (base, _) = spawn_server(StatusCode::SERVICE_UNAVAILABLE).await;
        let log = HttpProctoringLog::new(Client::new(), &base);

        let err = log.report(&report()).await.expect_err("server error");
        assert!(matches!(err, ServiceError::Status { status: 503, .. }));
    }
}
