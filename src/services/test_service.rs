use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::ServiceError;
use crate::core::config::Settings;
use crate::schemas::submission::{ErrorBody, SubmitPayload, SubmitReceipt};
use crate::schemas::test::TestDefinition;

/// Remote owner of test definitions and of grading.
#[async_trait]
pub trait TestService: Send + Sync {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDefinition, ServiceError>;

    async fn submit(
        &self,
        test_id: &str,
        payload: &SubmitPayload,
    ) -> Result<SubmitReceipt, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct HttpTestService {
    client: Client,
    base_url: String,
}

impl HttpTestService {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = super::build_http_client(settings.api())?;
        Ok(Self::new(client, &settings.api().base_url))
    }

    pub fn new(client: Client, base_url: &str) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// `{base}/tests/{id}[/{action}]` with the id escaped as one path segment.
    fn test_url(&self, test_id: &str, action: Option<&str>) -> Result<Url, ServiceError> {
        let invalid = |reason: String| ServiceError::InvalidUrl { url: self.base_url.clone(), reason };
        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(String::from("cannot be a base")))?
            .pop_if_empty()
            .push("tests")
            .push(test_id)
            .extend(action);
        Ok(url)
    }
}

#[async_trait]
impl TestService for HttpTestService {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDefinition, ServiceError> {
        let url = self.test_url(test_id, None)?.to_string();
        tracing::debug!(test_id, "Fetching test definition");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ServiceError::transport(&url, err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(test_id.to_string()));
        }
        if !status.is_success() {
            return Err(ServiceError::Status { endpoint: url, status: status.as_u16() });
        }

        let raw = response.text().await.map_err(|err| ServiceError::transport(&url, err))?;
        // Some deployments answer an unknown id with 200 and a null body.
        if raw.trim().is_empty() || raw.trim() == "null" {
            return Err(ServiceError::NotFound(test_id.to_string()));
        }

        serde_json::from_str::<TestDefinition>(&raw)
            .map_err(|err| ServiceError::InvalidResponse { endpoint: url, reason: err.to_string() })
    }

    async fn submit(
        &self,
        test_id: &str,
        payload: &SubmitPayload,
    ) -> Result<SubmitReceipt, ServiceError> {
        let url = self.test_url(test_id, Some("submit"))?.to_string();
        tracing::info!(
            test_id,
            student_id = %payload.student_id,
            answered = payload.answers.len(),
            time_left = payload.time_left,
            "Submitting exam answers"
        );

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|err| ServiceError::transport(&url, err))?;

        let status = response.status();
        let raw = response.text().await.map_err(|err| ServiceError::transport(&url, err))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| String::from("Submission failed"));
            tracing::warn!(test_id, status = status.as_u16(), %message, "Submission rejected");
            return Err(ServiceError::Rejected(message));
        }

        // The attempt is graded once the status is 2xx, whatever the body says.
        let evaluation = if raw.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(test_id, error = %err, "Submission accepted with a non-JSON body");
                serde_json::Value::String(raw)
            })
        };

        Ok(SubmitReceipt { evaluation })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    use super::*;
    use crate::schemas::submission::Answers;
    use crate::test_support;

    #[derive(Clone, Default)]
    struct ServerState {
        submitted: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn get_test(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
        match id.as_str() {
            "t-1" | "unit 1/quiz?v=2#a" => (StatusCode::OK, Json(test_support::sample_test_json(&id, 10))),
            "broken" => (StatusCode::OK, Json(json!({"_id": "broken", "duration": "soon"}))),
            "gone" => (StatusCode::OK, Json(Value::Null)),
            "boom" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
            _ => (StatusCode::NOT_FOUND, Json(json!({"msg": "Test not found"}))),
        }
    }

    async fn submit_test(
        Path(id): Path<String>,
        State(state): State<ServerState>,
        Json(body): Json<Value>,
    ) -> Response {
        match id.as_str() {
            "closed" => {
                return (StatusCode::BAD_REQUEST, Json(json!({"msg": "Test window is closed"})))
                    .into_response()
            }
            "opaque" => return (StatusCode::BAD_GATEWAY, Json(json!({}))).into_response(),
            _ => {}
        }
        let plain = id == "plain";
        state.submitted.lock().await.push((id, body));
        if plain {
            return (StatusCode::OK, "Submitted").into_response();
        }
        (StatusCode::OK, Json(json!({"score": 4, "total": 6}))).into_response()
    }

    async fn spawn_server() -> (String, ServerState) {
        let state = ServerState::default();
        let app = Router::new()
            .route("/tests/:id", get(get_test))
            .route("/tests/:id/submit", post(submit_test))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), state)
    }

    fn payload() -> SubmitPayload {
        let mut answers = Answers::new();
        answers.insert(0, "H2O".to_string());
        SubmitPayload::new(&test_support::student(), answers, 120)
    }

    #[tokio::test]
    async fn fetch_test_parses_definition() {
        let (base, _) = spawn_server().await;
        let service = HttpTestService::new(Client::new(), &format!("{base}/"));

        let test = service.fetch_test("t-1").await.expect("fetch");
        assert_eq!(test.id, "t-1");
        assert_eq!(test.duration, 10);
        assert_eq!(test.questions.len(), 3);
    }

    #[tokio::test]
    async fn fetch_test_escapes_id_as_one_segment() {
        let (base, _) = spawn_server().await;
        let service = HttpTestService::new(Client::new(), &format!("{base}/"));

        let test = service.fetch_test("unit 1/quiz?v=2#a").await.expect("fetch");
        assert_eq!(test.id, "unit 1/quiz?v=2#a");
        assert_eq!(
            service.test_url("a/b", Some("submit")).expect("url").as_str(),
            format!("{base}/tests/a%2Fb/submit")
        );
    }

    #[tokio::test]
    async fn fetch_test_maps_missing_and_failures() {
        let (base, _) = spawn_server().await;
        let service = HttpTestService::new(Client::new(), &base);

        assert!(matches!(service.fetch_test("nope").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.fetch_test("gone").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.fetch_test("boom").await,
            Err(ServiceError::Status { status: 500, .. })
        ));
        assert!(matches!(
            service.fetch_test("broken").await,
            Err(ServiceError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_test_reports_unreachable_service() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let service = HttpTestService::new(Client::new(), &format!("http://{addr}"));
        let err = service.fetch_test("t-1").await.expect_err("unreachable");
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn submit_posts_payload_and_returns_evaluation() {
        let (base, state) = spawn_server().await;
        let service = HttpTestService::new(Client::new(), &base);

        let receipt = service.submit("t-1", &payload()).await.expect("submit");
        assert_eq!(receipt.evaluation, json!({"score": 4, "total": 6}));

        let submitted = state.submitted.lock().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, "t-1");
        assert_eq!(submitted[0].1["studentId"], "u-1");
        assert_eq!(submitted[0].1["answers"], json!({"0": "H2O"}));
        assert_eq!(submitted[0].1["timeLeft"], 120);
    }

    #[tokio::test]
    async fn submit_surfaces_server_message() {
        let (base, _) = spawn_server().await;
        let service = HttpTestService::new(Client::new(), &base);

        let err = service.submit("closed", &payload()).await.expect_err("rejected");
        assert_eq!(err.to_string(), "Test window is closed");

        let err = service.submit("opaque", &payload()).await.expect_err("rejected");
        assert_eq!(err.to_string(), "Submission failed");
    }

    #[tokio::test]
    async fn submit_accepts_plain_text_success_body() {
        let (base, state) = spawn_server().await;
        let service = HttpTestService::new(Client::new(), &base);

        let receipt = service.submit("plain", &payload()).await.expect("accepted");
        assert_eq!(receipt.evaluation, Value::String("Submitted".to_string()));
        assert_eq!(state.submitted.lock().await.len(), 1);
    }
}
