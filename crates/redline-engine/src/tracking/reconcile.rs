//! Apply a proposed clean-text replacement back onto the real document as
//! new tracked changes.
//!
//! The flow per paragraph:
//!
//! 1. Snapshot the paragraph into a [`PositionMap`]
//! 2. Word-diff its clean text against the proposed text
//! 3. Coalesce the diff into combined operations (delete, insert, replace)
//! 4. Map every operation to real offsets through the snapshot
//! 5. Apply in ascending order, adding the running shift from earlier
//!    insertions; deletions only mark text and never shift
//!
//! Every marking primitive returns the id it created, so each
//! [`WordChange`] carries its ids without rescanning the document.
//!
//! A host error part way through one edit rolls that edit back. In a batch
//! the failed edit is reported and the rest still apply.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::editing::{Editor, EditorError};
use crate::models::{Attribution, ChangeId, ParagraphId};
use crate::tracking::diff::{ChunkKind, DiffChunk, diff_words};
use crate::tracking::position_map::PositionMap;

/// Agent output in edit mode: the full replacement text for one block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedEdit {
    pub paragraph_id: ParagraphId,
    pub new_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProposedEdit {
    pub fn new(paragraph_id: impl Into<ParagraphId>, new_text: impl Into<String>) -> Self {
        Self {
            paragraph_id: paragraph_id.into(),
            new_text: new_text.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// One delete, insert or replace actually performed on the document
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordChange {
    pub paragraph_id: ParagraphId,
    pub deleted_text: String,
    pub inserted_text: String,
    /// Span in the clean text the edit was computed against
    pub clean_range: Range<usize>,
    pub deletion_ids: Vec<ChangeId>,
    pub insertion_ids: Vec<ChangeId>,
    pub reason: Option<String>,
}

impl WordChange {
    pub fn ids(&self) -> impl Iterator<Item = &ChangeId> {
        self.deletion_ids.iter().chain(self.insertion_ids.iter())
    }
}

/// Result of applying a batch of proposed edits
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub changes: Vec<WordChange>,
    /// Paragraphs that no longer exist and were skipped
    pub skipped: Vec<ParagraphId>,
    /// Edits the host refused, rolled back and left out of `changes`
    pub failed: Vec<FailedEdit>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEdit {
    pub paragraph_id: ParagraphId,
    pub error: String,
}

/// Step already taken for the edit in progress
#[derive(Clone, Debug, PartialEq, Eq)]
enum Undo {
    Mark(ChangeId),
    /// Inserted but not yet marked
    Text(Range<usize>),
}

/// Combined operation in clean-text coordinates
#[derive(Clone, Debug, PartialEq, Eq)]
enum CleanOp<'a> {
    Delete {
        range: Range<usize>,
        text: &'a str,
    },
    Insert {
        at: usize,
        text: &'a str,
    },
    Replace {
        range: Range<usize>,
        deleted: &'a str,
        inserted: &'a str,
    },
}

/// Pair every delete with an insert at the same old boundary
fn combine<'a>(chunks: &[DiffChunk<'a>]) -> Vec<CleanOp<'a>> {
    let mut ops = Vec::new();
    let mut iter = chunks.iter().filter(|c| c.kind != ChunkKind::Keep).peekable();

    while let Some(chunk) = iter.next() {
        let partner = iter.peek().filter(|next| {
            next.kind != chunk.kind
                && match chunk.kind {
                    ChunkKind::Delete => next.old_range.start == chunk.old_range.end,
                    _ => next.old_range.start == chunk.old_range.start,
                }
        });

        let op = match (chunk.kind, partner) {
            (ChunkKind::Delete, Some(insert)) => CleanOp::Replace {
                range: chunk.old_range.clone(),
                deleted: chunk.text,
                inserted: insert.text,
            },
            (ChunkKind::Insert, Some(delete)) => CleanOp::Replace {
                range: delete.old_range.clone(),
                deleted: delete.text,
                inserted: chunk.text,
            },
            (ChunkKind::Delete, None) => CleanOp::Delete {
                range: chunk.old_range.clone(),
                text: chunk.text,
            },
            _ => CleanOp::Insert {
                at: chunk.old_range.start,
                text: chunk.text,
            },
        };
        if partner.is_some() {
            iter.next();
        }
        ops.push(op);
    }
    ops
}

/// Reconcile one proposed edit.
///
/// Returns an empty list when the paragraph no longer exists or the proposed
/// text equals its clean text. On error the document is left as it was.
pub fn reconcile_paragraph<E: Editor + ?Sized>(
    editor: &mut E,
    edit: &ProposedEdit,
    attribution: &Attribution,
) -> Result<Vec<WordChange>, EditorError> {
    Ok(reconcile(editor, edit, attribution)?.unwrap_or_default())
}

/// Reconcile a batch in order.
///
/// Missing paragraphs are skipped and edits the host refuses are rolled
/// back; both are reported and never stop the rest of the batch.
pub fn apply_proposed_edits<E: Editor + ?Sized>(
    editor: &mut E,
    edits: &[ProposedEdit],
    attribution: &Attribution,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    for edit in edits {
        match reconcile(editor, edit, attribution) {
            Ok(Some(changes)) => outcome.changes.extend(changes),
            Ok(None) => outcome.skipped.push(edit.paragraph_id.clone()),
            Err(err) => {
                log::warn!("proposed edit for {} failed: {err}", edit.paragraph_id);
                outcome.failed.push(FailedEdit {
                    paragraph_id: edit.paragraph_id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    if !outcome.skipped.is_empty() {
        log::warn!(
            "{} proposed edit(s) skipped for missing paragraphs",
            outcome.skipped.len()
        );
    }
    outcome
}

/// `None` when the paragraph is gone
fn reconcile<E: Editor + ?Sized>(
    editor: &mut E,
    edit: &ProposedEdit,
    attribution: &Attribution,
) -> Result<Option<Vec<WordChange>>, EditorError> {
    let Some(paragraph) = editor.paragraph(&edit.paragraph_id) else {
        log::warn!(
            "paragraph {} not found, skipping proposed edit",
            edit.paragraph_id
        );
        return Ok(None);
    };

    let map = PositionMap::build(&paragraph);
    if map.clean_text() == edit.new_text {
        log::debug!("paragraph {} unchanged", edit.paragraph_id);
        return Ok(Some(Vec::new()));
    }

    let chunks = diff_words(map.clean_text(), &edit.new_text);
    let ops = combine(&chunks);

    let mut undo = Vec::new();
    match apply_ops(editor, edit, &map, ops, attribution, &mut undo) {
        Ok(changes) => Ok(Some(changes)),
        Err(err) => {
            roll_back(editor, undo);
            Err(err)
        }
    }
}

fn apply_ops<E: Editor + ?Sized>(
    editor: &mut E,
    edit: &ProposedEdit,
    map: &PositionMap,
    ops: Vec<CleanOp<'_>>,
    attribution: &Attribution,
    undo: &mut Vec<Undo>,
) -> Result<Vec<WordChange>, EditorError> {
    let author = attribution.author.as_str();
    let date = attribution.date;
    let mut shift = 0usize;
    let mut changes = Vec::with_capacity(ops.len());

    for op in ops {
        let mut change = WordChange {
            paragraph_id: edit.paragraph_id.clone(),
            deleted_text: String::new(),
            inserted_text: String::new(),
            clean_range: 0..0,
            deletion_ids: Vec::new(),
            insertion_ids: Vec::new(),
            reason: edit.reason.clone(),
        };

        match op {
            CleanOp::Delete { range, text } => {
                let real = shifted(&map.clean_range_to_doc(range.clone()), shift);
                log::debug!("mark deletion {real:?} (clean {range:?})");
                let id = editor.mark_deletion(real, author, date)?;
                undo.push(Undo::Mark(id.clone()));
                change.deletion_ids.push(id);
                change.deleted_text = text.to_string();
                change.clean_range = range;
            }
            CleanOp::Insert { at, text } => {
                let pos = map.clean_to_doc(at) + shift;
                log::debug!("insert {} bytes at {pos} (clean {at})", text.len());
                let id = insert_marked(editor, pos, text, attribution, undo)?;
                change.insertion_ids.push(id);
                change.inserted_text = text.to_string();
                change.clean_range = at..at;
                shift += text.len();
            }
            CleanOp::Replace {
                range,
                deleted,
                inserted,
            } => {
                let real = shifted(&map.clean_range_to_doc(range.clone()), shift);
                log::debug!(
                    "replace {real:?} (clean {range:?}) with {} bytes",
                    inserted.len()
                );
                let pos = real.end;
                let deletion = editor.mark_deletion(real, author, date)?;
                undo.push(Undo::Mark(deletion.clone()));
                let insertion = insert_marked(editor, pos, inserted, attribution, undo)?;
                change.deletion_ids.push(deletion);
                change.insertion_ids.push(insertion);
                change.deleted_text = deleted.to_string();
                change.inserted_text = inserted.to_string();
                change.clean_range = range;
                shift += inserted.len();
            }
        }
        changes.push(change);
    }

    Ok(changes)
}

fn insert_marked<E: Editor + ?Sized>(
    editor: &mut E,
    pos: usize,
    text: &str,
    attribution: &Attribution,
    undo: &mut Vec<Undo>,
) -> Result<ChangeId, EditorError> {
    let range = pos..pos + text.len();
    editor.insert_at(pos, text)?;
    undo.push(Undo::Text(range.clone()));
    let id = editor.mark_insertion(range, &attribution.author, attribution.date)?;
    // Rejecting the mark removes the text too
    undo.pop();
    undo.push(Undo::Mark(id.clone()));
    Ok(id)
}

/// Undo the steps of a failed edit, latest first
fn roll_back<E: Editor + ?Sized>(editor: &mut E, undo: Vec<Undo>) {
    for step in undo.into_iter().rev() {
        let result = match &step {
            Undo::Mark(id) => editor.reject_mark(id),
            Undo::Text(range) => editor.delete_range(range.clone()),
        };
        if let Err(err) = result {
            log::warn!("could not roll back {step:?}: {err}");
        }
    }
}

fn shifted(range: &Range<usize>, shift: usize) -> Range<usize> {
    range.start + shift..range.end + shift
}
