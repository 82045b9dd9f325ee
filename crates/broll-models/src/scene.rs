//! Timeline scene descriptors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One slot of the narration timeline that receives a single clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneDescriptor {
    /// Position in the timeline (0-based)
    pub index: usize,

    /// Start of the scene in seconds from the beginning of the narration
    pub timestamp: f64,

    /// Words spoken around this timestamp
    pub context_snippet: String,

    /// Visual search query; empty until resolved
    #[serde(default)]
    pub query: String,
}

impl SceneDescriptor {
    /// Create an unresolved scene.
    pub fn new(index: usize, timestamp: f64, context_snippet: impl Into<String>) -> Self {
        Self {
            index,
            timestamp,
            context_snippet: context_snippet.into(),
            query: String::new(),
        }
    }

    /// Returns a copy of this scene with the query attached.
    pub fn with_query(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..self.clone()
        }
    }

    /// Whether a query has been attached.
    pub fn is_resolved(&self) -> bool {
        !self.query.is_empty()
    }
}
