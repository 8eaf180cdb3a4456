use std::ops::Range;

use xi_rope::delta::Transformer;
use xi_rope::{Delta, RopeInfo};

use crate::models::{Attribution, ChangeId, Mark, MarkKind};

/// One contiguous piece of a mark in the buffer. A mark id may own several pieces.
///
/// A deletion piece laid over another author's pending insertion keeps that
/// insertion in `displaced`. Rejecting the deletion puts it back.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MarkSpan {
    pub mark: Mark,
    pub range: Range<usize>,
    pub displaced: Option<Mark>,
}

impl MarkSpan {
    pub fn new(mark: Mark, range: Range<usize>) -> Self {
        Self {
            mark,
            range,
            displaced: None,
        }
    }

    fn displaced_id(&self) -> Option<&ChangeId> {
        self.displaced.as_ref().map(|mark| &mark.id)
    }
}

/// Transform mark pieces through a delta.
///
/// Starts move past text inserted exactly at them and ends stay before it, so
/// text inserted at a mark boundary is never absorbed by that mark. Pieces
/// that collapse to nothing are dropped.
pub(crate) fn transform_marks(marks: &mut Vec<MarkSpan>, delta: &Delta<RopeInfo>) {
    let mut transformer = Transformer::new(delta);
    for span in marks.iter_mut() {
        let start = transformer.transform(span.range.start, true);
        let end = transformer.transform(span.range.end, false);
        span.range = start..end.max(start);
    }
    marks.retain(|span| span.range.start < span.range.end);
}

/// Split any piece strictly containing `at` into two pieces of the same mark.
///
/// Done before an insertion so the inserted text lands between the halves
/// and stays unmarked.
pub(crate) fn split_marks_at(marks: &mut Vec<MarkSpan>, at: usize) {
    let Some(index) = marks
        .iter()
        .position(|span| span.range.start < at && at < span.range.end)
    else {
        return;
    };
    let tail = MarkSpan {
        range: at..marks[index].range.end,
        ..marks[index].clone()
    };
    marks[index].range.end = at;
    marks.insert(index + 1, tail);
}

/// Apply a new mark of `kind` over `range` and return the id if anything was marked.
///
/// Unmarked text inside the range is always marked. A deletion also covers
/// the parts of pending insertions inside the range, keeping each covered
/// insertion as displaced; everything else already marked is left untouched.
pub(crate) fn apply_mark(
    marks: &mut Vec<MarkSpan>,
    range: Range<usize>,
    kind: MarkKind,
    attribution: &Attribution,
) -> Option<ChangeId> {
    let id = ChangeId::generate();
    let mark = Mark::new(id.clone(), kind, attribution);
    let piece = |range: Range<usize>| MarkSpan::new(mark.clone(), range);

    let mut next = Vec::with_capacity(marks.len() + 2);
    let mut cursor = range.start;
    let mut created = false;

    for span in marks.drain(..) {
        if span.range.end <= range.start || span.range.start >= range.end {
            next.push(span);
            continue;
        }

        if span.range.start > cursor {
            next.push(piece(cursor..span.range.start));
            created = true;
        }
        cursor = cursor.max(span.range.end.min(range.end));

        if kind == MarkKind::Deletion && span.mark.kind == MarkKind::Insertion {
            if span.range.start < range.start {
                next.push(MarkSpan::new(
                    span.mark.clone(),
                    span.range.start..range.start,
                ));
            }
            next.push(MarkSpan {
                displaced: Some(span.mark.clone()),
                ..piece(span.range.start.max(range.start)..span.range.end.min(range.end))
            });
            created = true;
            if span.range.end > range.end {
                next.push(MarkSpan::new(span.mark, range.end..span.range.end));
            }
        } else {
            next.push(span);
        }
    }

    if cursor < range.end {
        next.push(piece(cursor..range.end));
        created = true;
    }

    next.sort_by_key(|span| span.range.start);
    *marks = coalesce(next);

    created.then_some(id)
}

/// Merge touching pieces of the same mark covering the same displaced insertion
fn coalesce(spans: Vec<MarkSpan>) -> Vec<MarkSpan> {
    let mut merged: Vec<MarkSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut()
            && last.mark.id == span.mark.id
            && last.displaced_id() == span.displaced_id()
            && last.range.end == span.range.start
        {
            last.range.end = span.range.end;
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Remove every piece of mark `id`, returning the removed pieces in order
pub(crate) fn take_mark(marks: &mut Vec<MarkSpan>, id: &ChangeId) -> Vec<MarkSpan> {
    let (taken, kept): (Vec<_>, Vec<_>) = marks.drain(..).partition(|span| &span.mark.id == id);
    *marks = kept;
    taken
}

/// Put back the insertions displaced by the pieces of a rejected deletion
pub(crate) fn restore_displaced(marks: &mut Vec<MarkSpan>, pieces: Vec<MarkSpan>) {
    marks.extend(
        pieces
            .into_iter()
            .filter_map(|piece| Some(MarkSpan::new(piece.displaced?, piece.range))),
    );
    marks.sort_by_key(|span| span.range.start);
    let merged = coalesce(std::mem::take(marks));
    *marks = merged;
}

/// Forget insertion `id` under every deletion covering it, returning the covered ranges
pub(crate) fn release_displaced(marks: &mut [MarkSpan], id: &ChangeId) -> Vec<Range<usize>> {
    marks
        .iter_mut()
        .filter(|span| span.displaced_id() == Some(id))
        .map(|span| {
            span.displaced = None;
            span.range.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xi_rope::Rope;
    use xi_rope::delta::Builder;

    fn span(id: &str, kind: MarkKind, range: Range<usize>) -> MarkSpan {
        MarkSpan::new(
            Mark::new(ChangeId::from(id), kind, &Attribution::undated("old")),
            range,
        )
    }

    fn by() -> Attribution {
        Attribution::undated("new")
    }

    #[test]
    fn marking_settled_text_creates_one_piece() {
        let mut marks = vec![];
        let id = apply_mark(&mut marks, 2..5, MarkKind::Insertion, &by()).unwrap();

        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].mark.id, id);
        assert_eq!(marks[0].range, 2..5);
        assert_eq!(marks[0].mark.author, "new");
    }

    #[test]
    fn deletion_skips_existing_deletions() {
        let mut marks = vec![span("d0", MarkKind::Deletion, 4..6)];
        let id = apply_mark(&mut marks, 2..8, MarkKind::Deletion, &by()).unwrap();

        let ranges: Vec<_> = marks.iter().map(|s| (s.mark.id.clone(), s.range.clone())).collect();
        assert_eq!(
            ranges,
            vec![
                (id.clone(), 2..4),
                (ChangeId::from("d0"), 4..6),
                (id, 6..8),
            ]
        );
    }

    #[test]
    fn deletion_covers_part_of_insertion() {
        let mut marks = vec![span("i0", MarkKind::Insertion, 0..10)];
        let id = apply_mark(&mut marks, 3..6, MarkKind::Deletion, &by()).unwrap();

        assert_eq!(marks.len(), 3);
        assert_eq!(marks[0].mark.id, ChangeId::from("i0"));
        assert_eq!(marks[0].range, 0..3);
        assert_eq!(marks[1].mark.id, id);
        assert_eq!(marks[1].mark.kind, MarkKind::Deletion);
        assert_eq!(marks[1].range, 3..6);
        assert_eq!(marks[1].displaced_id(), Some(&ChangeId::from("i0")));
        assert_eq!(marks[2].mark.id, ChangeId::from("i0"));
        assert_eq!(marks[2].range, 6..10);
    }

    #[test]
    fn deletion_across_insertion_and_settled_text_splits_on_displaced() {
        let mut marks = vec![span("i0", MarkKind::Insertion, 2..4)];
        let id = apply_mark(&mut marks, 0..6, MarkKind::Deletion, &by()).unwrap();

        let pieces: Vec<_> = marks
            .iter()
            .map(|s| (s.mark.id.clone(), s.range.clone(), s.displaced_id().cloned()))
            .collect();
        assert_eq!(
            pieces,
            vec![
                (id.clone(), 0..2, None),
                (id.clone(), 2..4, Some(ChangeId::from("i0"))),
                (id, 4..6, None),
            ]
        );
    }

    #[test]
    fn restoring_displaced_rejoins_the_insertion() {
        let mut marks = vec![span("i0", MarkKind::Insertion, 0..10)];
        let id = apply_mark(&mut marks, 3..6, MarkKind::Deletion, &by()).unwrap();

        let pieces = take_mark(&mut marks, &id);
        restore_displaced(&mut marks, pieces);

        assert_eq!(marks, vec![span("i0", MarkKind::Insertion, 0..10)]);
    }

    #[test]
    fn releasing_displaced_reports_covered_ranges() {
        let mut marks = vec![span("i0", MarkKind::Insertion, 0..10)];
        apply_mark(&mut marks, 3..6, MarkKind::Deletion, &by()).unwrap();

        let covered = release_displaced(&mut marks, &ChangeId::from("i0"));

        assert_eq!(covered, vec![3..6]);
        assert!(marks.iter().all(|s| s.displaced.is_none()));
    }

    #[test]
    fn nothing_to_mark_inside_existing_deletion() {
        let mut marks = vec![span("d0", MarkKind::Deletion, 0..10)];
        assert!(apply_mark(&mut marks, 2..5, MarkKind::Deletion, &by()).is_none());
        assert!(apply_mark(&mut marks, 2..5, MarkKind::Insertion, &by()).is_none());
        assert_eq!(marks, vec![span("d0", MarkKind::Deletion, 0..10)]);
    }

    #[test]
    fn insertion_at_mark_boundary_is_not_absorbed() {
        let base = Rope::from("abcdef");
        let mut marks = vec![span("d0", MarkKind::Deletion, 2..4)];

        let mut builder = Builder::new(base.len());
        builder.replace(4..4, Rope::from("XY"));
        transform_marks(&mut marks, &builder.build());
        assert_eq!(marks[0].range, 2..4);

        let mut builder = Builder::new(base.len() + 2);
        builder.replace(2..2, Rope::from("Z"));
        transform_marks(&mut marks, &builder.build());
        assert_eq!(marks[0].range, 3..5);
    }

    #[test]
    fn deleting_a_piece_drops_it() {
        let base = Rope::from("abcdef");
        let mut marks = vec![
            span("i0", MarkKind::Insertion, 1..3),
            span("i1", MarkKind::Insertion, 4..6),
        ];

        let mut builder = Builder::new(base.len());
        builder.delete(1..3);
        transform_marks(&mut marks, &builder.build());

        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].range, 2..4);
    }

    #[test]
    fn text_inserted_inside_a_split_piece_stays_unmarked() {
        let base = Rope::from("abcdef");
        let mut marks = vec![span("i0", MarkKind::Insertion, 1..5)];

        split_marks_at(&mut marks, 3);
        let mut builder = Builder::new(base.len());
        builder.replace(3..3, Rope::from("XY"));
        transform_marks(&mut marks, &builder.build());

        let ranges: Vec<_> = marks.iter().map(|s| s.range.clone()).collect();
        assert_eq!(ranges, vec![1..3, 5..7]);
    }

    #[test]
    fn split_at_piece_edge_is_a_no_op() {
        let mut marks = vec![span("d0", MarkKind::Deletion, 2..4)];
        split_marks_at(&mut marks, 2);
        split_marks_at(&mut marks, 4);
        assert_eq!(marks, vec![span("d0", MarkKind::Deletion, 2..4)]);
    }

    #[test]
    fn take_mark_removes_all_pieces() {
        let mut marks = vec![
            span("d0", MarkKind::Deletion, 0..2),
            span("d1", MarkKind::Deletion, 2..4),
            span("d0", MarkKind::Deletion, 4..6),
        ];

        let taken = take_mark(&mut marks, &ChangeId::from("d0"));

        assert_eq!(taken.len(), 2);
        assert_eq!(marks, vec![span("d1", MarkKind::Deletion, 2..4)]);
    }
}
