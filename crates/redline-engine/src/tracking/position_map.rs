use std::ops::Range;

use serde::Serialize;

use crate::models::Paragraph;

/// One run of a paragraph as seen by the position map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub text: String,
    pub is_deleted: bool,
    pub is_inserted: bool,
    /// Real offset of the segment from the paragraph start
    pub offset: usize,
}

/// Bidirectional mapping between one paragraph's clean text and real document offsets.
///
/// A map is a snapshot: it never re-reads the document, so every position
/// derived from one map is consistent with the same document state even while
/// the caller is mutating the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionMap {
    clean_text: String,
    segments: Vec<Segment>,
    start: usize,
}

impl PositionMap {
    pub fn build(paragraph: &Paragraph) -> Self {
        let mut clean_text = String::new();
        let mut segments = Vec::with_capacity(paragraph.runs.len());
        let mut offset = 0;

        for run in paragraph.runs.iter().filter(|run| !run.text.is_empty()) {
            segments.push(Segment {
                text: run.text.clone(),
                is_deleted: run.is_deleted(),
                is_inserted: run.is_inserted(),
                offset,
            });
            offset += run.text.len();
            if !run.is_deleted() {
                clean_text.push_str(&run.text);
            }
        }

        Self {
            clean_text,
            segments,
            start: paragraph.start,
        }
    }

    pub fn clean_text(&self) -> &str {
        &self.clean_text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Real offset of the paragraph start
    pub fn start(&self) -> usize {
        self.start
    }

    /// Real length of the paragraph, deleted text included
    pub fn real_len(&self) -> usize {
        self.segments
            .last()
            .map(|segment| segment.offset + segment.text.len())
            .unwrap_or(0)
    }

    /// Map a clean-text offset to a real document offset.
    ///
    /// An offset on the boundary between visible segments lands at the start
    /// of the next visible segment, i.e. after any deleted text in between.
    /// Offsets at or past the end of the clean text map to the paragraph end.
    pub fn clean_to_doc(&self, pos: usize) -> usize {
        let mut clean_start = 0;
        for segment in self.segments.iter().filter(|segment| !segment.is_deleted) {
            let len = segment.text.len();
            if pos < clean_start + len {
                let within = pos.saturating_sub(clean_start);
                return self.start + segment.offset + within;
            }
            clean_start += len;
        }
        log::trace!(
            "clean offset {pos} is past the clean text ({} bytes), mapping to paragraph end",
            self.clean_text.len()
        );
        self.start + self.real_len()
    }

    pub fn clean_range_to_doc(&self, range: Range<usize>) -> Range<usize> {
        self.clean_to_doc(range.start)..self.clean_to_doc(range.end)
    }

    /// Map a real document offset back into clean text.
    ///
    /// Offsets inside deleted text collapse to the clean offset where that
    /// text would have been.
    pub fn doc_to_clean(&self, pos: usize) -> usize {
        let relative = pos.saturating_sub(self.start);
        let mut clean = 0;
        for segment in &self.segments {
            let len = segment.text.len();
            if relative < segment.offset + len {
                if segment.is_deleted {
                    return clean;
                }
                return clean + relative.saturating_sub(segment.offset);
            }
            if !segment.is_deleted {
                clean += len;
            }
        }
        self.clean_text.len()
    }
}
