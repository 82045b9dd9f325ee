//! Narration script text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Narration script, either one string or an ordered list of fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ScriptText {
    Single(String),
    Fragments(Vec<String>),
}

impl Default for ScriptText {
    fn default() -> Self {
        ScriptText::Single(String::new())
    }
}

impl ScriptText {
    /// Full script, fragments joined with single spaces.
    pub fn joined(&self) -> String {
        match self {
            ScriptText::Single(text) => text.clone(),
            ScriptText::Fragments(parts) => parts
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Lowercased whitespace-separated words used for timing math.
    pub fn words(&self) -> Vec<String> {
        self.joined()
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect()
    }

    /// True when the script has no words.
    pub fn is_empty(&self) -> bool {
        self.joined().split_whitespace().next().is_none()
    }
}
