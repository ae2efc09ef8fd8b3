use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
}

/// A key press with the modifiers the proctoring rules care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
}

/// Browser-level events observed by the platform adapter and forwarded to the
/// session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSignal {
    VisibilityChanged { hidden: bool },
    FullscreenChanged { active: bool },
    Key(KeyChord),
    Clipboard(ClipboardAction),
}

impl KeyChord {
    pub fn plain(key: impl Into<String>) -> Self {
        Self { key: key.into(), ctrl: false, shift: false }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self { key: key.into(), ctrl: true, shift: false }
    }

    /// Parses chords like `ctrl+c`, `ctrl+shift+i`, `f12` or `esc`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut chord = KeyChord::plain(String::new());
        for part in raw.split('+').map(str::trim).filter(|part| !part.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "esc" | "escape" => chord.key = String::from("Escape"),
                "f12" => chord.key = String::from("F12"),
                _ => chord.key = part.to_string(),
            }
        }
        if chord.key.is_empty() {
            None
        } else {
            Some(chord)
        }
    }

    fn key_in(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.key.eq_ignore_ascii_case(key))
    }

    /// Clipboard chords, devtools shortcuts and Escape.
    pub fn is_cheat_key(&self) -> bool {
        (self.ctrl && self.key_in(&["c", "x", "v"]))
            || self.key == "F12"
            || (self.ctrl && self.shift && self.key_in(&["i", "c", "j"]))
            || self.key == "Escape"
    }
}

impl PlatformSignal {
    /// Whether the adapter must suppress the default action. Clipboard actions
    /// are always blocked, even after the exam is over.
    pub fn should_block(&self, submitted: bool) -> bool {
        match self {
            PlatformSignal::Clipboard(_) => true,
            PlatformSignal::Key(chord) => chord.is_cheat_key() && !submitted,
            PlatformSignal::VisibilityChanged { .. } | PlatformSignal::FullscreenChanged { .. } => {
                false
            }
        }
    }
}
