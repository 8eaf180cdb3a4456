use serde::{Deserialize, Serialize};

use crate::models::{ParagraphId, Run};

/// Kind of text block. Headings reconcile exactly like paragraphs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
}

impl BlockKind {
    /// Heading with the level clamped to 1..=6
    pub fn heading(level: u8) -> Self {
        BlockKind::Heading {
            level: level.clamp(1, 6),
        }
    }
}

/// Read-only view of one block as currently held by the host.
///
/// `start`/`end` are real document offsets and are only valid for the
/// document state the view was read from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: ParagraphId,
    pub kind: BlockKind,
    pub start: usize,
    pub end: usize,
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Text with deletion-marked runs removed
    pub fn clean_text(&self) -> String {
        self.runs
            .iter()
            .filter(|run| !run.is_deleted())
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Everything the paragraph occupies in the real document
    pub fn real_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
