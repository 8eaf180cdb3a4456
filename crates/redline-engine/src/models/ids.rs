use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a block, assigned once by the host and kept across edits
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParagraphId(pub String);

/// Identifier of one attribution mark (insertion or deletion)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub String);

impl ParagraphId {
    /// Generate a fresh, globally unique id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ChangeId {
    /// Generate a fresh, globally unique id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParagraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParagraphId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParagraphId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ChangeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
