use serde::{Deserialize, Serialize};

/// A key press with its modifiers, as reported by the display surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyChord {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyChord {
    /// Parse `"Ctrl+S"`, `"cmd+s"` and the like. Modifier order does not matter.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut chord = KeyChord::default();
        for part in raw.split('+').map(str::trim) {
            match part.to_ascii_lowercase().as_str() {
                "" => return None,
                "ctrl" | "control" => chord.ctrl = true,
                "cmd" | "command" | "meta" | "super" => chord.meta = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                key if chord.key.is_empty() => chord.key = key.to_string(),
                _ => return None,
            }
        }
        (!chord.key.is_empty()).then_some(chord)
    }

    /// Ctrl+S or Cmd+S, with no other modifiers.
    pub fn is_manual_save(&self) -> bool {
        (self.ctrl || self.meta) && !self.shift && !self.alt && self.key.eq_ignore_ascii_case("s")
    }
}
