use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChangeId;

/// The two kinds of pending edit a run can be marked with
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Insertion,
    Deletion,
}

/// Who proposed an edit and when. Threaded explicitly into every mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub author: String,
    pub date: Option<DateTime<Utc>>,
}

impl Attribution {
    pub fn new(author: impl Into<String>, date: Option<DateTime<Utc>>) -> Self {
        Self {
            author: author.into(),
            date,
        }
    }

    /// Attribution stamped with the current time
    pub fn now(author: impl Into<String>) -> Self {
        Self::new(author, Some(Utc::now()))
    }

    /// Attribution without a timestamp
    pub fn undated(author: impl Into<String>) -> Self {
        Self::new(author, None)
    }
}

/// An attribution mark carried by a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub id: ChangeId,
    pub kind: MarkKind,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
}

impl Mark {
    pub fn new(id: ChangeId, kind: MarkKind, attribution: &Attribution) -> Self {
        Self {
            id,
            kind,
            author: attribution.author.clone(),
            date: attribution.date,
        }
    }
}

/// A text fragment with at most one attribution mark.
///
/// An unmarked run is settled text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub mark: Option<Mark>,
}

impl Run {
    pub fn settled(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mark: None,
        }
    }

    pub fn marked(text: impl Into<String>, mark: Mark) -> Self {
        Self {
            text: text.into(),
            mark: Some(mark),
        }
    }

    pub fn kind(&self) -> Option<MarkKind> {
        self.mark.as_ref().map(|m| m.kind)
    }

    pub fn is_deleted(&self) -> bool {
        self.kind() == Some(MarkKind::Deletion)
    }

    pub fn is_inserted(&self) -> bool {
        self.kind() == Some(MarkKind::Insertion)
    }
}
