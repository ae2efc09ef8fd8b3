use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schemas::user::CurrentUser;
use crate::session::ViolationKind;

/// Question index to answer value.
pub type Answers = BTreeMap<usize, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub student_id: String,
    pub student_roll: String,
    pub student_email: String,
    pub student_name: String,
    pub answers: Answers,
    pub time_left: u64,
}

impl SubmitPayload {
    pub fn new(user: &CurrentUser, answers: Answers, time_left: u64) -> Self {
        Self {
            student_id: user.id.clone(),
            student_roll: user.roll_number.clone(),
            student_email: user.email.clone(),
            student_name: user.name.clone(),
            answers,
            time_left,
        }
    }
}

/// Whatever the evaluation service returns; grading lives server side.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub evaluation: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheatingReport {
    pub student_id: String,
    pub test_id: String,
    pub event: ViolationKind,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) msg: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.msg.or(self.message).filter(|value| !value.trim().is_empty())
    }
}
