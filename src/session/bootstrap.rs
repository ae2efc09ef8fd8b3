use validator::Validate;

use crate::schemas::test::TestDefinition;
use crate::services::{SessionStore, TestService};
use crate::session::error::SessionError;
use crate::session::persistence::Persister;
use crate::session::state::{storage_key, ExamSession};

#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub test: TestDefinition,
    pub session: ExamSession,
    pub restored: bool,
}

/// Loads the test and either resumes the persisted attempt or starts a fresh
/// one with the full duration.
pub async fn bootstrap(
    tests: &dyn TestService,
    store: &dyn SessionStore,
    test_id: &str,
    student_id: &str,
) -> Result<Bootstrap, SessionError> {
    let test = tests.fetch_test(test_id).await.map_err(|err| {
        tracing::error!(test_id, error = %err, "Failed to load test");
        SessionError::Fetch(err)
    })?;
    test.validate().map_err(|err| {
        tracing::error!(test_id, error = %err, "Test definition failed validation");
        SessionError::InvalidTest(err)
    })?;

    let key = storage_key(student_id, test_id);
    let duration_seconds = test.duration_seconds();

    let bootstrap = match Persister::load(store, &key).await {
        Some(snapshot) => {
            let session = ExamSession::restore(test_id, student_id, duration_seconds, snapshot);
            tracing::info!(
                test_id,
                student_id,
                seconds_remaining = session.seconds_remaining(),
                violations = session.violation_count(),
                answered = session.answers().len(),
                "Resuming persisted exam session"
            );
            Bootstrap { test, session, restored: true }
        }
        None => {
            tracing::info!(test_id, student_id, duration_seconds, "Starting exam session");
            let session = ExamSession::fresh(test_id, student_id, duration_seconds);
            Bootstrap { test, session, restored: false }
        }
    };

    Ok(bootstrap)
}
