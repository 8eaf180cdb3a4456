//! Review queues for proposed edits and for agent recommendations.
//!
//! Both queues are ordered lists of units that start `Pending` and resolve
//! exactly once. Resolving a unit moves focus to the next pending unit after
//! it, wrapping to the first pending unit when nothing follows.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::editing::{Editor, EditorError};
use crate::models::{ChangeId, scan_tracked_changes};
use crate::tracking::grouping::{GroupedChange, group_changes};
use crate::tracking::reconcile::WordChange;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReviewError {
    #[error("no review unit at index {0}")]
    UnknownUnit(usize),
    #[error("review unit {0} is already resolved")]
    AlreadyResolved(usize),
    #[error(transparent)]
    Editor(#[from] EditorError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    Pending,
    /// Kept as ordinary tracked changes
    Applied,
    Accepted,
    Rejected,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    Applied,
    Discarded,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
    LeaveAlone,
}

/// Agent output in review mode, keyed to a numbered group list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub index: usize,
    #[serde(rename = "recommendation")]
    pub decision: Decision,
    #[serde(default)]
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditUnit {
    pub change: WordChange,
    pub status: EditStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecommendationUnit {
    pub recommendation: Recommendation,
    /// Snapshot of the group the recommendation was bound to
    pub group: GroupedChange,
    pub status: RecommendationStatus,
}

/// Result of resolving an edit unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditResolution {
    pub index: usize,
    /// Ids that were already gone from the document and were skipped
    pub missing: Vec<ChangeId>,
    pub next: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Discarded,
    /// The group changed underneath the recommendation; resolved as discarded
    SkippedStale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationResolution {
    pub index: usize,
    pub outcome: ApplyOutcome,
    pub next: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    /// Recommendations whose index had no matching group
    pub skipped: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyAllReport {
    pub applied: usize,
    pub stale: usize,
}

/// First pending index after `current`, else the first pending index overall
fn next_pending_index(
    len: usize,
    current: Option<usize>,
    is_pending: impl Fn(usize) -> bool,
) -> Option<usize> {
    let after = current.map_or(0, |index| index + 1);
    (after..len)
        .find(|&index| is_pending(index))
        .or_else(|| (0..len).find(|&index| is_pending(index)))
}

/// Id sets of the review units currently in the document
fn live_groups<E: Editor + ?Sized>(editor: &E) -> Vec<HashSet<ChangeId>> {
    group_changes(scan_tracked_changes(&editor.read_paragraphs()))
        .iter()
        .map(|group| group.ids().cloned().collect())
        .collect()
}

/// Queue of word changes produced by reconciliation
#[derive(Clone, Debug, Default)]
pub struct EditReview {
    units: Vec<EditUnit>,
    focus: Option<usize>,
    advance_on_resolve: bool,
}

impl EditReview {
    pub fn new(advance_on_resolve: bool) -> Self {
        Self {
            units: Vec::new(),
            focus: None,
            advance_on_resolve,
        }
    }

    /// Append changes as pending units and return their indices
    pub fn push_changes(&mut self, changes: impl IntoIterator<Item = WordChange>) -> Range<usize> {
        let start = self.units.len();
        self.units.extend(changes.into_iter().map(|change| EditUnit {
            change,
            status: EditStatus::Pending,
        }));
        if self.focus.is_none() {
            self.focus = self.next_pending(None);
        }
        start..self.units.len()
    }

    pub fn units(&self) -> &[EditUnit] {
        &self.units
    }

    pub fn get(&self, index: usize) -> Option<&EditUnit> {
        self.units.get(index)
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn pending_count(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.status == EditStatus::Pending)
            .count()
    }

    pub fn next_pending(&self, current: Option<usize>) -> Option<usize> {
        next_pending_index(self.units.len(), current, |index| {
            self.units[index].status == EditStatus::Pending
        })
    }

    /// Accept every mark of the unit
    pub fn accept<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        index: usize,
    ) -> Result<EditResolution, ReviewError> {
        self.resolve(index, EditStatus::Accepted, |id| editor.accept_mark(id))
    }

    /// Resolve the unit as rejected without touching the document
    pub fn reject(&mut self, index: usize) -> Result<EditResolution, ReviewError> {
        self.resolve(index, EditStatus::Rejected, |_| Ok(()))
    }

    /// Reject every mark of the unit, restoring the text it replaced
    pub fn revert<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        index: usize,
    ) -> Result<EditResolution, ReviewError> {
        self.resolve(index, EditStatus::Rejected, |id| editor.reject_mark(id))
    }

    /// Resolve the unit but leave its marks in the document
    pub fn keep(&mut self, index: usize) -> Result<EditResolution, ReviewError> {
        self.resolve(index, EditStatus::Applied, |_| Ok(()))
    }

    fn resolve(
        &mut self,
        index: usize,
        status: EditStatus,
        mut primitive: impl FnMut(&ChangeId) -> Result<(), EditorError>,
    ) -> Result<EditResolution, ReviewError> {
        let unit = self.units.get(index).ok_or(ReviewError::UnknownUnit(index))?;
        if unit.status != EditStatus::Pending {
            return Err(ReviewError::AlreadyResolved(index));
        }

        let mut missing = Vec::new();
        for id in unit.change.ids() {
            match primitive(id) {
                Ok(()) => {}
                Err(EditorError::UnknownMark(gone)) => {
                    log::warn!("tracked change {gone} vanished before unit {index} was resolved");
                    missing.push(gone);
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.units[index].status = status;
        log::debug!("edit unit {index} resolved as {status:?}");
        let next = self.next_pending(Some(index));
        if self.advance_on_resolve {
            self.focus = next;
        }
        Ok(EditResolution {
            index,
            missing,
            next,
        })
    }
}

/// Queue of agent recommendations bound to grouped changes
#[derive(Clone, Debug, Default)]
pub struct RecommendationReview {
    units: Vec<RecommendationUnit>,
    focus: Option<usize>,
    advance_on_resolve: bool,
}

impl RecommendationReview {
    pub fn new(advance_on_resolve: bool) -> Self {
        Self {
            units: Vec::new(),
            focus: None,
            advance_on_resolve,
        }
    }

    /// Replace the queue with a new batch bound to `groups`.
    ///
    /// Recommendations pointing past the end of `groups` are skipped and
    /// counted.
    pub fn ingest(
        &mut self,
        recommendations: Vec<Recommendation>,
        groups: &[GroupedChange],
    ) -> IngestReport {
        let mut report = IngestReport::default();
        self.units.clear();

        for recommendation in recommendations {
            let Some(group) = groups.get(recommendation.index) else {
                log::warn!(
                    "recommendation for group {} skipped, only {} groups exist",
                    recommendation.index,
                    groups.len()
                );
                report.skipped += 1;
                continue;
            };
            self.units.push(RecommendationUnit {
                group: group.clone(),
                recommendation,
                status: RecommendationStatus::Pending,
            });
            report.accepted += 1;
        }

        self.focus = self.next_pending(None);
        report
    }

    pub fn units(&self) -> &[RecommendationUnit] {
        &self.units
    }

    pub fn get(&self, index: usize) -> Option<&RecommendationUnit> {
        self.units.get(index)
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn pending_count(&self) -> usize {
        self.units
            .iter()
            .filter(|unit| unit.status == RecommendationStatus::Pending)
            .count()
    }

    pub fn next_pending(&self, current: Option<usize>) -> Option<usize> {
        next_pending_index(self.units.len(), current, |index| {
            self.units[index].status == RecommendationStatus::Pending
        })
    }

    /// Carry out the recommended decision on every id of its group
    pub fn apply<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        index: usize,
    ) -> Result<RecommendationResolution, ReviewError> {
        let live = live_groups(editor);
        self.apply_with(editor, index, &live)
    }

    /// Resolve without touching the document
    pub fn discard(&mut self, index: usize) -> Result<RecommendationResolution, ReviewError> {
        self.pending_unit(index)?;
        Ok(self.finish(index, RecommendationStatus::Discarded, ApplyOutcome::Discarded))
    }

    /// Apply every pending recommendation in list order
    pub fn apply_all<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
    ) -> Result<ApplyAllReport, ReviewError> {
        let mut report = ApplyAllReport::default();
        let pending: Vec<usize> = (0..self.units.len())
            .filter(|&index| self.units[index].status == RecommendationStatus::Pending)
            .collect();

        for index in pending {
            let live = live_groups(editor);
            match self.apply_with(editor, index, &live)?.outcome {
                ApplyOutcome::SkippedStale => report.stale += 1,
                _ => report.applied += 1,
            }
        }
        Ok(report)
    }

    fn apply_with<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        index: usize,
        live: &[HashSet<ChangeId>],
    ) -> Result<RecommendationResolution, ReviewError> {
        let unit = self.pending_unit(index)?;

        let bound: HashSet<ChangeId> = unit.group.ids().cloned().collect();
        if !live.contains(&bound) {
            log::warn!("recommendation {index} is stale, its group no longer matches the document");
            return Ok(self.finish(
                index,
                RecommendationStatus::Discarded,
                ApplyOutcome::SkippedStale,
            ));
        }

        let decision = unit.recommendation.decision;
        let ids: Vec<ChangeId> = unit.group.ids().cloned().collect();
        for id in &ids {
            match decision {
                Decision::Accept => editor.accept_mark(id)?,
                Decision::Reject => editor.reject_mark(id)?,
                Decision::LeaveAlone => {}
            }
        }
        Ok(self.finish(index, RecommendationStatus::Applied, ApplyOutcome::Applied))
    }

    fn pending_unit(&self, index: usize) -> Result<&RecommendationUnit, ReviewError> {
        let unit = self.units.get(index).ok_or(ReviewError::UnknownUnit(index))?;
        if unit.status != RecommendationStatus::Pending {
            return Err(ReviewError::AlreadyResolved(index));
        }
        Ok(unit)
    }

    fn finish(
        &mut self,
        index: usize,
        status: RecommendationStatus,
        outcome: ApplyOutcome,
    ) -> RecommendationResolution {
        self.units[index].status = status;
        log::debug!("recommendation {index} resolved as {status:?}");
        let next = self.next_pending(Some(index));
        if self.advance_on_resolve {
            self.focus = next;
        }
        RecommendationResolution {
            index,
            outcome,
            next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{BlockSeed, Document};
    use crate::models::{Attribution, Mark, MarkKind, ParagraphId, Run};
    use crate::tracking::grouping::group_changes;
    use crate::tracking::reconcile::{ProposedEdit, reconcile_paragraph};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn by() -> Attribution {
        Attribution::undated("agent")
    }

    fn reconciled(text: &str, proposed: &str) -> (Document, EditReview) {
        let mut doc = Document::from_blocks(vec![
            BlockSeed::paragraph(vec![Run::settled(text)]).with_id("p"),
        ]);
        let changes = reconcile_paragraph(&mut doc, &ProposedEdit::new("p", proposed), &by())
            .unwrap();
        let mut review = EditReview::new(true);
        review.push_changes(changes);
        (doc, review)
    }

    fn clean(doc: &Document) -> String {
        doc.paragraph(&ParagraphId::from("p")).unwrap().clean_text()
    }

    #[rstest]
    #[case::from_start(None, Some(0))]
    #[case::after_current(Some(0), Some(2))]
    #[case::wraps_around(Some(3), Some(0))]
    #[case::skips_resolved(Some(2), Some(0))]
    fn next_pending_cases(#[case] current: Option<usize>, #[case] expected: Option<usize>) {
        let pending = [true, false, true, false];
        assert_eq!(next_pending_index(4, current, |i| pending[i]), expected);
    }

    #[test]
    fn next_pending_none_when_drained() {
        assert_eq!(next_pending_index(3, Some(1), |_| false), None);
        assert_eq!(next_pending_index(0, None, |_| true), None);
    }

    #[test]
    fn accept_replacement_settles_new_text() {
        let (mut doc, mut review) = reconciled("colour", "color");

        let resolution = review.accept(&mut doc, 0).unwrap();

        assert_eq!(doc.text(), "color");
        assert!(doc.mark_ids().is_empty());
        assert!(resolution.missing.is_empty());
        assert_eq!(review.units()[0].status, EditStatus::Accepted);
        assert_eq!(resolution.next, None);
    }

    #[test]
    fn reject_resolves_without_touching_document() {
        let (doc, mut review) = reconciled("Hello there world", "Hi world");
        let before = doc.clone();

        let resolution = review.reject(0).unwrap();

        assert_eq!(doc, before);
        assert_eq!(review.units()[0].status, EditStatus::Rejected);
        assert_eq!(resolution.next, None);
    }

    #[test]
    fn revert_restores_original_text() {
        let (mut doc, mut review) = reconciled("Hello there world", "Hi world");

        review.revert(&mut doc, 0).unwrap();

        assert_eq!(doc.text(), "Hello there world");
        assert_eq!(clean(&doc), "Hello there world");
        assert!(doc.mark_ids().is_empty());
        assert_eq!(review.units()[0].status, EditStatus::Rejected);
    }

    #[test]
    fn keep_leaves_marks_in_place() {
        let (mut doc, mut review) = reconciled("The sky is blue.", "The sky is very blue.");
        let before = doc.mark_ids();

        review.keep(0).unwrap();

        assert_eq!(doc.mark_ids(), before);
        assert_eq!(review.units()[0].status, EditStatus::Applied);
        assert_eq!(review.pending_count(), 0);
    }

    #[test]
    fn resolving_twice_or_out_of_range_fails() {
        let (mut doc, mut review) = reconciled("a b", "a c");

        review.keep(0).unwrap();
        assert_eq!(review.accept(&mut doc, 0), Err(ReviewError::AlreadyResolved(0)));
        assert_eq!(review.keep(7), Err(ReviewError::UnknownUnit(7)));
    }

    #[test]
    fn vanished_ids_are_reported_and_unit_still_resolves() {
        let (mut doc, mut review) = reconciled("colour", "color");
        let deletion = review.units()[0].change.deletion_ids[0].clone();
        doc.accept_mark(&deletion).unwrap();

        let resolution = review.accept(&mut doc, 0).unwrap();

        assert_eq!(resolution.missing, vec![deletion]);
        assert_eq!(review.units()[0].status, EditStatus::Accepted);
        assert_eq!(doc.text(), "color");
    }

    #[test]
    fn focus_advances_with_wrap_around() {
        let (mut doc, mut review) = reconciled("a b c d e", "x b y d z");
        assert_eq!(review.units().len(), 3);
        assert_eq!(review.focus(), Some(0));

        review.keep(1).unwrap();
        assert_eq!(review.focus(), Some(2));
        review.reject(2).unwrap();
        assert_eq!(review.focus(), Some(0));
        review.accept(&mut doc, 0).unwrap();
        assert_eq!(review.focus(), None);
    }

    #[test]
    fn focus_stays_put_without_advance() {
        let (_, mut advancing) = reconciled("a b c", "x b y");
        let changes: Vec<_> = advancing.units().iter().map(|u| u.change.clone()).collect();
        let mut review = EditReview::new(false);
        review.push_changes(changes);

        let resolution = review.keep(0).unwrap();
        assert_eq!(resolution.next, Some(1));
        assert_eq!(review.focus(), Some(0));
        advancing.keep(0).unwrap();
        assert_eq!(advancing.focus(), Some(1));
    }

    // ============ Recommendations ============

    fn mark(id: &str, kind: MarkKind) -> Mark {
        Mark::new(ChangeId::from(id), kind, &Attribution::undated("bob"))
    }

    /// Two groups: "grey" -> "blue" replacement, and a lone deletion
    fn reviewed_document() -> (Document, Vec<GroupedChange>) {
        let doc = Document::from_blocks(vec![
            BlockSeed::paragraph(vec![
                Run::settled("The "),
                Run::marked("grey", mark("d1", MarkKind::Deletion)),
                Run::marked("blue", mark("i1", MarkKind::Insertion)),
                Run::settled(" sky"),
                Run::marked(" today", mark("d2", MarkKind::Deletion)),
            ])
            .with_id("p"),
        ]);
        let groups = group_changes(scan_tracked_changes(&doc.read_paragraphs()));
        (doc, groups)
    }

    fn recommend(index: usize, decision: Decision) -> Recommendation {
        Recommendation {
            index,
            decision,
            reason: String::new(),
        }
    }

    #[test]
    fn ingest_skips_out_of_range_indices() {
        let (_, groups) = reviewed_document();
        let mut review = RecommendationReview::new(true);

        let report = review.ingest(
            vec![
                recommend(0, Decision::Accept),
                recommend(2, Decision::Reject),
                recommend(1, Decision::LeaveAlone),
            ],
            &groups,
        );

        assert_eq!(report, IngestReport { accepted: 2, skipped: 1 });
        assert_eq!(review.units().len(), 2);
        assert_eq!(review.units()[1].group.deletion_ids, vec![ChangeId::from("d2")]);
    }

    #[test]
    fn apply_accept_and_reject_decisions() {
        let (mut doc, groups) = reviewed_document();
        let mut review = RecommendationReview::new(true);
        review.ingest(
            vec![recommend(0, Decision::Accept), recommend(1, Decision::Reject)],
            &groups,
        );

        let report = review.apply_all(&mut doc).unwrap();

        assert_eq!(report, ApplyAllReport { applied: 2, stale: 0 });
        assert_eq!(doc.text(), "The blue sky today");
        assert!(doc.mark_ids().is_empty());
    }

    #[test]
    fn leave_alone_resolves_without_touching_document() {
        let (mut doc, groups) = reviewed_document();
        let before = doc.clone();
        let mut review = RecommendationReview::new(true);
        review.ingest(vec![recommend(0, Decision::LeaveAlone)], &groups);

        let resolution = review.apply(&mut doc, 0).unwrap();

        assert_eq!(resolution.outcome, ApplyOutcome::Applied);
        assert_eq!(review.units()[0].status, RecommendationStatus::Applied);
        assert_eq!(doc, before);
    }

    #[test]
    fn discard_never_touches_document() {
        let (doc, groups) = reviewed_document();
        let mut review = RecommendationReview::new(true);
        review.ingest(vec![recommend(0, Decision::Reject)], &groups);

        let resolution = review.discard(0).unwrap();

        assert_eq!(resolution.outcome, ApplyOutcome::Discarded);
        assert_eq!(doc.mark_ids().len(), 3);
        assert_eq!(review.discard(0), Err(ReviewError::AlreadyResolved(0)));
    }

    #[test]
    fn stale_recommendation_is_discarded() {
        let (mut doc, groups) = reviewed_document();
        let mut review = RecommendationReview::new(true);
        review.ingest(
            vec![recommend(0, Decision::Reject), recommend(1, Decision::Accept)],
            &groups,
        );
        doc.accept_mark(&ChangeId::from("i1")).unwrap();

        let report = review.apply_all(&mut doc).unwrap();

        assert_eq!(report, ApplyAllReport { applied: 1, stale: 1 });
        assert_eq!(review.units()[0].status, RecommendationStatus::Discarded);
        assert_eq!(review.units()[1].status, RecommendationStatus::Applied);
        assert_eq!(doc.text(), "The greyblue sky");
    }

    #[test]
    fn group_grown_by_new_change_is_stale() {
        let (mut doc, groups) = reviewed_document();
        let mut review = RecommendationReview::new(true);
        review.ingest(
            vec![recommend(0, Decision::Accept), recommend(1, Decision::Accept)],
            &groups,
        );
        // "sky" now runs straight into the " today" deletion
        let grown = doc.mark_deletion(13..16, "carol", None).unwrap();

        let report = review.apply_all(&mut doc).unwrap();

        assert_eq!(report, ApplyAllReport { applied: 1, stale: 1 });
        assert_eq!(review.units()[1].status, RecommendationStatus::Discarded);
        assert_eq!(doc.mark_ids(), vec![grown, ChangeId::from("d2")]);
        assert_eq!(doc.text(), "The blue sky today");
    }
}
