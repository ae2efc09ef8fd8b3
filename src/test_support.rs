use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex, Notify, OwnedMutexGuard};

use crate::platform::{Camera, CameraError, Fullscreen, FullscreenError, MediaStream};
use crate::schemas::submission::{CheatingReport, SubmitPayload, SubmitReceipt};
use crate::schemas::test::TestDefinition;
use crate::schemas::user::CurrentUser;
use crate::services::{ProctoringLog, ServiceError, TestService};

pub(crate) const TEST_API_URL: &str = "http://127.0.0.1:8080/api";

const CLEARED_ENV: [&str; 18] = [
    "ENVIRONMENT",
    "PROCTOR_HTTP_TIMEOUT_SECONDS",
    "PROCTOR_HTTP_CONNECT_TIMEOUT_SECONDS",
    "PROCTOR_WARN_THRESHOLD",
    "PROCTOR_TERMINATE_AFTER",
    "PROCTOR_TICK_MILLIS",
    "PROCTOR_PERSIST_DEBOUNCE_MILLIS",
    "PROCTOR_TIME_CRITICAL_SECONDS",
    "PROCTOR_HOME_ROUTE",
    "PROCTOR_NOTIFICATION_MILLIS",
    "PROCTOR_STATE_DIR",
    "PROCTOR_CAMERA_DEVICE",
    "PROCTOR_CAMERA_POLL_MILLIS",
    "PROCTOR_LOG_LEVEL",
    "PROCTOR_LOG_JSON",
    "PROCTOR_METRICS_ENABLED",
    "PROCTOR_USER",
    "RUST_LOG",
];

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    std::env::set_var("PROCTOR_ENV", "test");
    std::env::set_var("PROCTOR_STRICT_CONFIG", "0");
    std::env::set_var("PROCTOR_API_URL", TEST_API_URL);
    for key in CLEARED_ENV {
        std::env::remove_var(key);
    }
}

pub(crate) fn student() -> CurrentUser {
    CurrentUser {
        id: "u-1".to_string(),
        name: "Asha Rao".to_string(),
        roll_number: "21CS042".to_string(),
        email: "asha@example.edu".to_string(),
        role: Some("student".to_string()),
    }
}

/// Three questions, one of each type: 0 is multiple choice (`H2O`/`CO2`),
/// 1 is true/false, 2 is short answer.
pub(crate) fn sample_test_json(id: &str, duration_minutes: u32) -> Value {
    json!({
        "_id": id,
        "testName": "Chemistry midterm",
        "duration": duration_minutes,
        "totalScore": 6,
        "questions": [
            {
                "question": "Water formula?",
                "type": "Multiple Choice",
                "options": ["H2O", "CO2"],
                "correctAnswer": "H2O",
                "score": 2
            },
            {
                "question": "Salt dissolves in water",
                "type": "True/False",
                "correctAnswer": "True",
                "score": 2
            },
            {
                "question": "Name a noble gas",
                "type": "Short Answer",
                "correctAnswer": "Neon",
                "score": 2
            }
        ]
    })
}

pub(crate) fn sample_test(id: &str, duration_minutes: u32) -> TestDefinition {
    serde_json::from_value(sample_test_json(id, duration_minutes)).expect("sample test")
}

pub(crate) struct FakeTestService {
    test: Option<TestDefinition>,
    failure: Option<String>,
    gate: Option<Arc<Notify>>,
    submissions: StdMutex<Vec<(String, SubmitPayload)>>,
}

impl FakeTestService {
    pub(crate) fn new(test: TestDefinition) -> Self {
        Self { test: Some(test), failure: None, gate: None, submissions: StdMutex::new(Vec::new()) }
    }

    pub(crate) fn missing() -> Self {
        Self { test: None, failure: None, gate: None, submissions: StdMutex::new(Vec::new()) }
    }

    /// Every submit is rejected with `message`.
    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Submits block until the gate is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn submissions(&self) -> Vec<(String, SubmitPayload)> {
        self.submissions.lock().expect("submissions lock").clone()
    }
}

#[async_trait]
impl TestService for FakeTestService {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDefinition, ServiceError> {
        self.test.clone().ok_or_else(|| ServiceError::NotFound(test_id.to_string()))
    }

    async fn submit(
        &self,
        test_id: &str,
        payload: &SubmitPayload,
    ) -> Result<SubmitReceipt, ServiceError> {
        self.submissions.lock().expect("submissions lock").push((test_id.to_string(), payload.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.failure {
            Some(message) => Err(ServiceError::Rejected(message.clone())),
            None => Ok(SubmitReceipt { evaluation: json!({"score": 2, "total": 6}) }),
        }
    }
}

/// Proctoring log that records reports, optionally after a delay.
#[derive(Default)]
pub(crate) struct FakeProctoringLog {
    reports: StdMutex<Vec<CheatingReport>>,
    delay: Option<Duration>,
}

impl FakeProctoringLog {
    pub(crate) fn delayed(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub(crate) fn reports(&self) -> Vec<CheatingReport> {
        self.reports.lock().expect("reports lock").clone()
    }
}

#[async_trait]
impl ProctoringLog for FakeProctoringLog {
    async fn report(&self, report: &CheatingReport) -> Result<(), ServiceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reports.lock().expect("reports lock").push(report.clone());
        Ok(())
    }
}

/// Camera whose single track can be ended from the test.
#[derive(Default)]
pub(crate) struct FakeCamera {
    deny: bool,
    live: Arc<AtomicUsize>,
    ended: StdMutex<Option<watch::Sender<bool>>>,
}

impl FakeCamera {
    pub(crate) fn denied() -> Self {
        Self { deny: true, ..Self::default() }
    }

    pub(crate) fn live_tracks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn end_track(&self) {
        self.live.store(0, Ordering::SeqCst);
        if let Some(ended) = self.ended.lock().expect("ended lock").as_ref() {
            let _ = ended.send(true);
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn acquire(&self) -> Result<Box<dyn MediaStream>, CameraError> {
        if self.deny {
            return Err(CameraError::PermissionDenied);
        }
        let (ended_tx, ended_rx) = watch::channel(false);
        *self.ended.lock().expect("ended lock") = Some(ended_tx);
        self.live.store(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream { live: self.live.clone(), ended: ended_rx }))
    }
}

struct FakeStream {
    live: Arc<AtomicUsize>,
    ended: watch::Receiver<bool>,
}

impl MediaStream for FakeStream {
    fn live_tracks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.live.store(0, Ordering::SeqCst);
    }

    fn track_ended(&self) -> watch::Receiver<bool> {
        self.ended.clone()
    }
}

#[derive(Default)]
pub(crate) struct FakeFullscreen {
    requests: AtomicUsize,
}

impl FakeFullscreen {
    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fullscreen for FakeFullscreen {
    async fn request_fullscreen(&self) -> Result<(), FullscreenError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
