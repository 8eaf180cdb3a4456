/*!
 * # Editing: the host document boundary
 *
 * The tracking core never owns a document. It reads blocks and issues
 * mutations through the [`Editor`] trait, which is the whole contract a host
 * editor surface has to fulfil:
 *
 * - **Read**: `read_paragraphs` / `paragraph` return immutable views with the
 *   real start/end offsets of each block, recomputed on every call
 * - **Track**: `mark_insertion` / `mark_deletion` attribute a range to an
 *   author and return the new mark id directly
 * - **Resolve**: `accept_mark` / `reject_mark` settle or drop a mark by id
 * - **Raw edits**: `insert_at`, `delete_range`, `replace_range` change the
 *   text without attribution
 *
 * The author and date are explicit arguments on every marking call; there is
 * no ambient "current author" state to save and restore.
 *
 * [`Document`] is the in-memory reference host used by tests and by embedders
 * that do not bring their own editor.
 */

use std::ops::Range;

use chrono::{DateTime, Utc};

use crate::models::{ChangeId, Paragraph, ParagraphId};

pub mod commands;
pub mod document;
pub(crate) mod marks;
pub mod patch;

pub use commands::Cmd;
pub use document::{BlockSeed, Document};
pub use patch::Patch;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("range {range:?} is reversed")]
    InvalidRange { range: Range<usize> },
    #[error("offset {0} is out of bounds or not on a character boundary")]
    NotCharBoundary(usize),
    #[error("range {range:?} does not lie inside a single block")]
    OutsideBlock { range: Range<usize> },
    #[error("nothing left to mark in {range:?}")]
    NothingToMark { range: Range<usize> },
    #[error("unknown mark {0}")]
    UnknownMark(ChangeId),
}

/// Primitives the tracking core consumes from the hosting editor
pub trait Editor {
    /// All blocks in document order
    fn read_paragraphs(&self) -> Vec<Paragraph>;

    fn paragraph(&self, id: &ParagraphId) -> Option<Paragraph> {
        self.read_paragraphs().into_iter().find(|p| &p.id == id)
    }

    /// Mark existing text in `range` as a pending insertion
    fn mark_insertion(
        &mut self,
        range: Range<usize>,
        author: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<ChangeId, EditorError>;

    /// Mark existing text in `range` as a pending deletion. The text stays in place.
    fn mark_deletion(
        &mut self,
        range: Range<usize>,
        author: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<ChangeId, EditorError>;

    fn accept_mark(&mut self, id: &ChangeId) -> Result<(), EditorError>;

    fn reject_mark(&mut self, id: &ChangeId) -> Result<(), EditorError>;

    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<(), EditorError>;

    fn insert_at(&mut self, pos: usize, text: &str) -> Result<(), EditorError>;

    fn delete_range(&mut self, range: Range<usize>) -> Result<(), EditorError>;
}
