//! Trigger phrase matching.
//!
//! Matching is exact equality after trimming surrounding whitespace and
//! lower-casing both sides. There is no substring or prefix matching.

use crate::error::{BotError, Result};

/// Normalize text for comparison: trim, then lower-case.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A trigger phrase, normalized once at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerPhrase {
    raw: String,
    normalized: String,
}

impl TriggerPhrase {
    /// Create a trigger phrase. Fails if the phrase is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let normalized = normalize(&raw);
        if normalized.is_empty() {
            return Err(BotError::EmptyTrigger);
        }
        Ok(Self { raw, normalized })
    }

    /// The phrase as configured, for logging
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The phrase used for comparison
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Check whether a comment body triggers a reply
    pub fn matches(&self, body: &str) -> bool {
        normalize(body) == self.normalized
    }
}

impl std::fmt::Display for TriggerPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
