use serde::{Deserialize, Serialize};

use crate::schemas::submission::Answers;
use crate::session::violation::{ViolationEvent, ViolationKind};

/// Persisted form of a session, stored under [`storage_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub timer: Option<u64>,
    #[serde(default)]
    pub warnings: u32,
    #[serde(default)]
    pub last_violation: Option<ViolationKind>,
}

pub fn storage_key(student_id: &str, test_id: &str) -> String {
    format!("exam-{student_id}-{test_id}")
}

/// One student's attempt at one test. All mutation goes through methods, and
/// none of them has an effect once the session is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamSession {
    test_id: String,
    student_id: String,
    answers: Answers,
    seconds_remaining: u64,
    violation_count: u32,
    last_violation: Option<ViolationKind>,
    submitted: bool,
}

impl ExamSession {
    pub fn fresh(test_id: &str, student_id: &str, duration_seconds: u64) -> Self {
        Self {
            test_id: test_id.to_string(),
            student_id: student_id.to_string(),
            answers: Answers::new(),
            seconds_remaining: duration_seconds,
            violation_count: 0,
            last_violation: None,
            submitted: false,
        }
    }

    /// Persisted values win over the test duration, so reloading never adds
    /// time back.
    pub fn restore(
        test_id: &str,
        student_id: &str,
        duration_seconds: u64,
        snapshot: SessionSnapshot,
    ) -> Self {
        Self {
            test_id: test_id.to_string(),
            student_id: student_id.to_string(),
            answers: snapshot.answers,
            seconds_remaining: snapshot.timer.unwrap_or(duration_seconds),
            violation_count: snapshot.warnings,
            last_violation: snapshot.last_violation,
            submitted: false,
        }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn storage_key(&self) -> String {
        storage_key(&self.student_id, &self.test_id)
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.seconds_remaining
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn last_violation(&self) -> Option<ViolationKind> {
        self.last_violation
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn record_answer(&mut self, index: usize, value: String) -> bool {
        if self.submitted {
            return false;
        }
        self.answers.insert(index, value);
        true
    }

    /// Decrements by one second and returns what is left. No-op at zero or
    /// after submission.
    pub fn tick(&mut self) -> u64 {
        if !self.submitted && self.seconds_remaining > 0 {
            self.seconds_remaining -= 1;
        }
        self.seconds_remaining
    }

    /// Counts one violation and returns the new total, or `None` once
    /// submitted.
    pub fn record_violation(&mut self, event: ViolationEvent) -> Option<u32> {
        if self.submitted {
            return None;
        }
        self.violation_count = self.violation_count.saturating_add(1);
        self.last_violation = Some(event.kind);
        Some(self.violation_count)
    }

    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            answers: self.answers.clone(),
            timer: Some(self.seconds_remaining),
            warnings: self.violation_count,
            last_violation: self.last_violation,
        }
    }
}
