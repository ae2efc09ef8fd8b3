use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::config::ProctoringSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    TabSwitch,
    FullscreenExit,
    CameraOff,
    CheatKey,
    Clipboard,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "tab-switch",
            ViolationKind::FullscreenExit => "fullscreen-exit",
            ViolationKind::CameraOff => "camera-off",
            ViolationKind::CheatKey => "cheat-key",
            ViolationKind::Clipboard => "clipboard",
        }
    }

    /// Human label: the kind with dashes read as spaces.
    pub fn label(self) -> String {
        self.as_str().replace('-', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationEvent {
    pub kind: ViolationKind,
    pub at: OffsetDateTime,
}

impl ViolationEvent {
    pub fn now(kind: ViolationKind) -> Self {
        Self { kind, at: OffsetDateTime::now_utc() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationVerdict {
    Warn { count: u32, final_warning: bool },
    Terminate { count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViolationPolicy {
    pub warn_threshold: u32,
    pub terminate_after: u32,
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        Self { warn_threshold: 3, terminate_after: 4 }
    }
}

impl From<&ProctoringSettings> for ViolationPolicy {
    fn from(settings: &ProctoringSettings) -> Self {
        Self { warn_threshold: settings.warn_threshold, terminate_after: settings.terminate_after }
    }
}

impl ViolationPolicy {
    pub fn evaluate(&self, count: u32) -> ViolationVerdict {
        if count >= self.terminate_after {
            ViolationVerdict::Terminate { count }
        } else {
            ViolationVerdict::Warn { count, final_warning: count >= self.warn_threshold }
        }
    }

    pub fn is_exhausted(&self, count: u32) -> bool {
        count >= self.terminate_after
    }

    pub fn warning_message(&self, kind: ViolationKind, count: u32, final_warning: bool) -> String {
        let advice = if final_warning {
            "Next violation will terminate the exam."
        } else {
            "Stay focused on the exam."
        };
        format!("Warning {count}/{}: {} detected.\n{advice}", self.warn_threshold, kind.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_terminates_on_fourth_violation() {
        let policy = ViolationPolicy::default();
        assert_eq!(policy.evaluate(1), ViolationVerdict::Warn { count: 1, final_warning: false });
        assert_eq!(policy.evaluate(2), ViolationVerdict::Warn { count: 2, final_warning: false });
        assert_eq!(policy.evaluate(3), ViolationVerdict::Warn { count: 3, final_warning: true });
        assert_eq!(policy.evaluate(4), ViolationVerdict::Terminate { count: 4 });
        assert!(policy.is_exhausted(5));
    }

    #[test]
    fn warning_message_matches_screen_copy() {
        let policy = ViolationPolicy::default();
        assert_eq!(
            policy.warning_message(ViolationKind::TabSwitch, 1, false),
            "Warning 1/3: tab switch detected.\nStay focused on the exam."
        );
        assert_eq!(
            policy.warning_message(ViolationKind::FullscreenExit, 3, true),
            "Warning 3/3: fullscreen exit detected.\nNext violation will terminate the exam."
        );
    }

    #[test]
    fn kinds_use_kebab_case_on_the_wire() {
        let value = serde_json::to_value(ViolationKind::CameraOff).expect("kind json");
        assert_eq!(value, serde_json::json!("camera-off"));
        let parsed: ViolationKind = serde_json::from_str("\"cheat-key\"").expect("kind");
        assert_eq!(parsed, ViolationKind::CheatKey);
    }
}
