//! Word-level diff between a paragraph's clean text and a proposed replacement.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use similar::{Algorithm, DiffTag, capture_diff_slices};

/// A word with its trailing whitespace, or leading whitespace at the very start
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+|\S+\s*").expect("invalid token regex"));

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Keep,
    Delete,
    Insert,
}

/// One run of the edit script.
///
/// `old_range` is in the old string; for inserts it is the empty insertion
/// point. `new_range` is in the new string; for deletes it is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiffChunk<'a> {
    pub kind: ChunkKind,
    pub text: &'a str,
    pub old_range: Range<usize>,
    pub new_range: Range<usize>,
}

/// Split into word tokens covering the whole input
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Byte offset of every token start plus the total length
fn offsets(tokens: &[&str]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(tokens.len() + 1);
    let mut at = 0;
    offsets.push(at);
    for token in tokens {
        at += token.len();
        offsets.push(at);
    }
    offsets
}

/// Minimal word-level edit script from `old` to `new`.
///
/// Concatenating keep and delete chunks rebuilds `old`; concatenating keep
/// and insert chunks rebuilds `new`. A replaced span comes out as a delete
/// directly followed by an insert at the end of the deleted text.
pub fn diff_words<'a>(old: &'a str, new: &'a str) -> Vec<DiffChunk<'a>> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);
    let old_at = offsets(&old_tokens);
    let new_at = offsets(&new_tokens);

    let mut chunks: Vec<DiffChunk<'a>> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old_tokens, &new_tokens) {
        let (tag, old_idx, new_idx) = op.as_tag_tuple();
        let old_range = old_at[old_idx.start]..old_at[old_idx.end];
        let new_range = new_at[new_idx.start]..new_at[new_idx.end];
        let old_point = old_range.end..old_range.end;
        let new_point = new_range.start..new_range.start;

        match tag {
            DiffTag::Equal => push(&mut chunks, ChunkKind::Keep, old, old_range, new_range),
            DiffTag::Delete => push(&mut chunks, ChunkKind::Delete, old, old_range, new_point),
            DiffTag::Insert => push(&mut chunks, ChunkKind::Insert, new, old_point, new_range),
            DiffTag::Replace => {
                push(&mut chunks, ChunkKind::Delete, old, old_range, new_point);
                push(&mut chunks, ChunkKind::Insert, new, old_point, new_range);
            }
        }
    }
    chunks
}

/// Append a chunk, merging it into the previous one when both are the same kind
fn push<'a>(
    chunks: &mut Vec<DiffChunk<'a>>,
    kind: ChunkKind,
    source: &'a str,
    old_range: Range<usize>,
    new_range: Range<usize>,
) {
    let source_range = |old: &Range<usize>, new: &Range<usize>| match kind {
        ChunkKind::Insert => new.clone(),
        ChunkKind::Keep | ChunkKind::Delete => old.clone(),
    };

    if let Some(last) = chunks.last_mut()
        && last.kind == kind
        && last.old_range.end == old_range.start
        && last.new_range.end == new_range.start
    {
        last.old_range.end = old_range.end;
        last.new_range.end = new_range.end;
        last.text = &source[source_range(&last.old_range, &last.new_range)];
        return;
    }
    if old_range.is_empty() && new_range.is_empty() {
        return;
    }
    let text = &source[source_range(&old_range, &new_range)];
    chunks.push(DiffChunk {
        kind,
        text,
        old_range,
        new_range,
    });
}
