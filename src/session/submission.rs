use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::schemas::submission::SubmitReceipt;
use crate::session::violation::ViolationKind;

/// One-way flag. The first `engage` wins; every later call is refused.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLatch {
    engaged: Arc<AtomicBool>,
}

impl SubmissionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&self) -> bool {
        !self.engaged.swap(true, Ordering::AcqRel)
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionTrigger {
    Manual,
    TimerExpired,
    Terminated,
}

impl SubmissionTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionTrigger::Manual => "manual",
            SubmissionTrigger::TimerExpired => "timer-expired",
            SubmissionTrigger::Terminated => "terminated",
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Submitted {
        trigger: SubmissionTrigger,
        receipt: SubmitReceipt,
        violation: Option<ViolationKind>,
    },
    SubmitFailed {
        trigger: SubmissionTrigger,
        reason: String,
        violation: Option<ViolationKind>,
    },
    Cancelled,
    Unmounted,
}

impl SessionOutcome {
    pub fn trigger(&self) -> Option<SubmissionTrigger> {
        match self {
            SessionOutcome::Submitted { trigger, .. } | SessionOutcome::SubmitFailed { trigger, .. } => {
                Some(*trigger)
            }
            SessionOutcome::Cancelled | SessionOutcome::Unmounted => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.trigger() == Some(SubmissionTrigger::Terminated)
    }
}
