use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};
use xi_rope::delta::{DeltaElement, Transformer};
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::commands::compile_command;
use crate::editing::marks::{
    MarkSpan, apply_mark, release_displaced, restore_displaced, split_marks_at, take_mark,
    transform_marks,
};
use crate::editing::{Cmd, Editor, EditorError, Patch};
use crate::models::{Attribution, BlockKind, ChangeId, MarkKind, Paragraph, ParagraphId, Run};

/// Bytes separating two blocks in the buffer
const BLOCK_SEPARATOR: &str = "\n";

/// Seed for one block when building a [`Document`]
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSeed {
    pub id: Option<ParagraphId>,
    pub kind: BlockKind,
    pub runs: Vec<Run>,
}

impl BlockSeed {
    pub fn paragraph(runs: Vec<Run>) -> Self {
        Self {
            id: None,
            kind: BlockKind::Paragraph,
            runs,
        }
    }

    pub fn heading(level: u8, runs: Vec<Run>) -> Self {
        Self {
            id: None,
            kind: BlockKind::heading(level),
            runs,
        }
    }

    pub fn with_id(mut self, id: impl Into<ParagraphId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BlockEntry {
    id: ParagraphId,
    kind: BlockKind,
    range: Range<usize>,
}

/// In-memory host document with track-changes marks.
///
/// ## Single source of truth
/// - The real text of every block lives in one `xi_rope::Rope` buffer, blocks
///   separated by a newline so two blocks never touch in real coordinates
/// - Deleted-but-pending text stays in the buffer; only accepting a deletion
///   (or rejecting an insertion) removes bytes
///
/// ## Spans survive edits
/// - Block spans and mark pieces are byte ranges transformed through every
///   buffer `Delta`
/// - Block ends grow with text inserted at them, mark boundaries do not
///
/// ## Usage
///
/// ```rust
/// use redline_engine::editing::{Document, Editor};
/// use redline_engine::models::Attribution;
///
/// let mut doc = Document::from_text("The sky is blue.");
/// let by = Attribution::undated("ada");
///
/// doc.insert_at(11, "very ").unwrap();
/// let id = doc.mark_insertion(11..16, &by.author, by.date).unwrap();
///
/// assert_eq!(doc.text(), "The sky is very blue.");
/// doc.accept_mark(&id).unwrap();
/// assert!(doc.read_paragraphs()[0].runs.iter().all(|run| run.mark.is_none()));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) buffer: Rope,
    blocks: Vec<BlockEntry>,
    pub(crate) marks: Vec<MarkSpan>,
    version: u64,
}

impl Document {
    /// Build a document from seeded blocks. An empty seed list yields one empty paragraph.
    pub fn from_blocks(seeds: Vec<BlockSeed>) -> Self {
        let seeds = if seeds.is_empty() {
            vec![BlockSeed::paragraph(vec![])]
        } else {
            seeds
        };

        let mut text = String::new();
        let mut blocks = Vec::with_capacity(seeds.len());
        let mut marks: Vec<MarkSpan> = Vec::new();

        for (index, seed) in seeds.into_iter().enumerate() {
            if index > 0 {
                text.push_str(BLOCK_SEPARATOR);
            }
            let start = text.len();
            for run in seed.runs {
                let run_start = text.len();
                text.push_str(&run.text);
                if let Some(mark) = run.mark
                    && !run.text.is_empty()
                {
                    match marks.last_mut() {
                        Some(last) if last.mark.id == mark.id && last.range.end == run_start => {
                            last.range.end = text.len();
                        }
                        _ => marks.push(MarkSpan::new(mark, run_start..text.len())),
                    }
                }
            }
            blocks.push(BlockEntry {
                id: seed.id.unwrap_or_else(ParagraphId::generate),
                kind: seed.kind,
                range: start..text.len(),
            });
        }

        Self {
            buffer: Rope::from(text),
            blocks,
            marks,
            version: 0,
        }
    }

    /// One settled paragraph per line
    pub fn from_text(text: &str) -> Self {
        let seeds = text
            .split(BLOCK_SEPARATOR)
            .map(|line| {
                let runs = if line.is_empty() {
                    vec![]
                } else {
                    vec![Run::settled(line)]
                };
                BlockSeed::paragraph(runs)
            })
            .collect();
        Self::from_blocks(seeds)
    }

    /// Raw buffer content, deleted-but-pending text included
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Incremented on every mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Ids of all marks currently present, in buffer order, without duplicates
    pub fn mark_ids(&self) -> Vec<ChangeId> {
        let mut seen = HashSet::new();
        self.marks
            .iter()
            .filter(|span| seen.insert(&span.mark.id))
            .map(|span| span.mark.id.clone())
            .collect()
    }

    /// Apply an untracked command to the buffer (Core Edit Loop).
    ///
    /// 1. Validate the target lies inside one block
    /// 2. Compile the command to a `Delta`
    /// 3. Apply the delta to the buffer
    /// 4. Transform block spans and mark pieces through the delta
    /// 5. Increment the version
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditorError> {
        self.block_index_for(&cmd.target())?;
        Ok(self.apply_unchecked(&cmd))
    }

    fn apply_unchecked(&mut self, cmd: &Cmd) -> Patch {
        if let Cmd::InsertText { text, .. } | Cmd::ReplaceRange { text, .. } = cmd
            && !text.is_empty()
        {
            let target = cmd.target();
            split_marks_at(&mut self.marks, target.start);
            split_marks_at(&mut self.marks, target.end);
        }
        let delta = compile_command(self.buffer.len(), cmd);

        let mut changed = Vec::new();
        let mut cursor = 0;
        for op in delta.els.iter() {
            match op {
                DeltaElement::Copy(from, to) => {
                    cursor += to - from;
                }
                DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    cursor += inserted.len();
                    changed.push(start..cursor);
                }
            }
        }

        self.buffer = delta.apply(&self.buffer);
        self.transform_blocks(&delta);
        transform_marks(&mut self.marks, &delta);
        self.version += 1;

        Patch {
            changed,
            version: self.version,
        }
    }

    /// Block starts stay before text inserted at them and block ends grow with it,
    /// so an insertion at either edge of a block lands inside that block.
    fn transform_blocks(&mut self, delta: &Delta<RopeInfo>) {
        let mut transformer = Transformer::new(delta);
        for block in &mut self.blocks {
            let start = transformer.transform(block.range.start, false);
            let end = transformer.transform(block.range.end, true);
            block.range = start..end.max(start);
        }
    }

    /// Index of the block fully containing `range`
    fn block_index_for(&self, range: &Range<usize>) -> Result<usize, EditorError> {
        if range.start > range.end {
            return Err(EditorError::InvalidRange {
                range: range.clone(),
            });
        }
        for offset in [range.start, range.end] {
            let in_bounds = offset <= self.buffer.len();
            if !in_bounds
                || (offset < self.buffer.len() && !self.buffer.is_codepoint_boundary(offset))
            {
                return Err(EditorError::NotCharBoundary(offset));
            }
        }
        self.blocks
            .iter()
            .position(|block| block.range.start <= range.start && range.end <= block.range.end)
            .ok_or_else(|| EditorError::OutsideBlock {
                range: range.clone(),
            })
    }

    fn paragraph_view(&self, block: &BlockEntry) -> Paragraph {
        let mut runs: Vec<Run> = Vec::new();
        let mut cursor = block.range.start;

        let pieces = self.marks.iter().filter(|span| {
            span.range.start >= block.range.start && span.range.end <= block.range.end
        });
        for span in pieces {
            if span.range.start > cursor {
                runs.push(Run::settled(self.slice(cursor..span.range.start)));
            }
            let text = self.slice(span.range.clone());
            match runs.last_mut() {
                Some(last)
                    if span.range.start == cursor
                        && last.mark.as_ref().map(|m| &m.id) == Some(&span.mark.id) =>
                {
                    last.text.push_str(&text);
                }
                _ => runs.push(Run::marked(text, span.mark.clone())),
            }
            cursor = span.range.end;
        }
        if cursor < block.range.end {
            runs.push(Run::settled(self.slice(cursor..block.range.end)));
        }

        Paragraph {
            id: block.id.clone(),
            kind: block.kind,
            start: block.range.start,
            end: block.range.end,
            runs,
        }
    }

    fn slice(&self, range: Range<usize>) -> String {
        self.buffer.slice_to_cow(range).into_owned()
    }

    fn mark(
        &mut self,
        range: Range<usize>,
        kind: MarkKind,
        author: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<ChangeId, EditorError> {
        self.block_index_for(&range)?;
        if range.is_empty() {
            return Err(EditorError::NothingToMark { range });
        }
        let attribution = Attribution::new(author, date);
        let id = apply_mark(&mut self.marks, range.clone(), kind, &attribution)
            .ok_or(EditorError::NothingToMark { range })?;
        self.version += 1;
        Ok(id)
    }

    /// Resolve mark `id`, either dropping only the mark or removing its text too.
    ///
    /// Parts of an insertion hidden under a later deletion are resolved with
    /// it. Rejecting a deletion brings back any insertion it displaced.
    fn resolve_mark(&mut self, id: &ChangeId, accept: bool) -> Result<(), EditorError> {
        let pieces = take_mark(&mut self.marks, id);
        let covered = release_displaced(&mut self.marks, id);
        let kind = match pieces.first() {
            Some(first) => first.mark.kind,
            None if !covered.is_empty() => MarkKind::Insertion,
            None => return Err(EditorError::UnknownMark(id.clone())),
        };

        let mut removed: Vec<Range<usize>> = match (kind, accept) {
            (MarkKind::Insertion, false) => pieces
                .iter()
                .map(|piece| piece.range.clone())
                .chain(covered)
                .collect(),
            (MarkKind::Deletion, true) => pieces.iter().map(|piece| piece.range.clone()).collect(),
            (MarkKind::Deletion, false) => {
                restore_displaced(&mut self.marks, pieces);
                Vec::new()
            }
            (MarkKind::Insertion, true) => Vec::new(),
        };
        if removed.is_empty() {
            self.version += 1;
            return Ok(());
        }

        removed.sort_by_key(|range| range.start);
        // Back to front so earlier ranges stay valid
        for range in removed.into_iter().rev() {
            self.apply_unchecked(&Cmd::DeleteRange { range });
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::from_blocks(vec![])
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.buffer.to_string() == other.buffer.to_string()
            && self.blocks == other.blocks
            && self.marks == other.marks
            && self.version == other.version
    }
}

impl Editor for Document {
    fn read_paragraphs(&self) -> Vec<Paragraph> {
        self.blocks
            .iter()
            .map(|block| self.paragraph_view(block))
            .collect()
    }

    fn paragraph(&self, id: &ParagraphId) -> Option<Paragraph> {
        self.blocks
            .iter()
            .find(|block| &block.id == id)
            .map(|block| self.paragraph_view(block))
    }

    fn mark_insertion(
        &mut self,
        range: Range<usize>,
        author: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<ChangeId, EditorError> {
        self.mark(range, MarkKind::Insertion, author, date)
    }

    fn mark_deletion(
        &mut self,
        range: Range<usize>,
        author: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<ChangeId, EditorError> {
        self.mark(range, MarkKind::Deletion, author, date)
    }

    fn accept_mark(&mut self, id: &ChangeId) -> Result<(), EditorError> {
        self.resolve_mark(id, true)
    }

    fn reject_mark(&mut self, id: &ChangeId) -> Result<(), EditorError> {
        self.resolve_mark(id, false)
    }

    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<(), EditorError> {
        self.apply(Cmd::ReplaceRange {
            range,
            text: text.to_string(),
        })
        .map(|_| ())
    }

    fn insert_at(&mut self, pos: usize, text: &str) -> Result<(), EditorError> {
        self.apply(Cmd::InsertText {
            at: pos,
            text: text.to_string(),
        })
        .map(|_| ())
    }

    fn delete_range(&mut self, range: Range<usize>) -> Result<(), EditorError> {
        self.apply(Cmd::DeleteRange { range }).map(|_| ())
    }
}
