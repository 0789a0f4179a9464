use std::time::Duration;

use miette::miette;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AutoCorrect {
    #[default]
    On,
    Off,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AutoCapitalize {
    None,
    #[default]
    Sentences,
    Words,
    Characters,
}

impl AutoCorrect {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoCorrect::On => "on",
            AutoCorrect::Off => "off",
        }
    }
}

impl AutoCapitalize {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoCapitalize::None => "none",
            AutoCapitalize::Sentences => "sentences",
            AutoCapitalize::Words => "words",
            AutoCapitalize::Characters => "characters",
        }
    }
}

/// Per-editor settings supplied by the host.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// `id` of the editor root element.
    pub editor_id: SmolStr,
    pub read_only: bool,
    pub spellcheck: bool,
    pub auto_correct: AutoCorrect,
    pub auto_capitalize: AutoCapitalize,
    /// Shown while the document is a single empty block.
    pub placeholder: Option<String>,
    /// Minimum spacing between handled selection-change events.
    pub selection_throttle_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            editor_id: SmolStr::new_static("quire-editor"),
            read_only: false,
            spellcheck: true,
            auto_correct: AutoCorrect::default(),
            auto_capitalize: AutoCapitalize::default(),
            placeholder: None,
            selection_throttle_ms: 100,
        }
    }
}

impl EditorConfig {
    /// Parse host-supplied JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> miette::Result<EditorConfig> {
        serde_json::from_str(json).map_err(|e| miette!("error parsing editor config {}", e))
    }

    pub fn selection_throttle(&self) -> Duration {
        Duration::from_millis(self.selection_throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EditorConfig::from_json(r#"{"read_only": true, "auto_correct": "off"}"#).unwrap();
        assert!(config.read_only);
        assert_eq!(config.auto_correct, AutoCorrect::Off);
        assert_eq!(config.selection_throttle_ms, 100);
        assert_eq!(config.editor_id, "quire-editor");
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(EditorConfig::from_json("{read_only").is_err());
    }
}
