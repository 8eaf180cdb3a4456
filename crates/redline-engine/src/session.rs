//! UI-facing facade over one host document and its review queues.

use redline_config::Config;

use crate::agent::{AgentError, AgentResponse, EditRequest, ReviewRequest, parse_response};
use crate::editing::Editor;
use crate::models::{Attribution, TrackedChange, scan_tracked_changes};
use crate::tracking::{
    ApplyAllReport, CleanTextIndex, EditResolution, EditReview, GroupedChange, IngestReport,
    ProposedEdit, Recommendation, RecommendationResolution, RecommendationReview,
    ReconcileOutcome, ReviewError, apply_proposed_edits, group_changes,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

/// What applying an agent reply did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    /// Free-form reply, nothing applied
    Message(String),
    Edits(ReconcileOutcome),
    Recommendations(IngestReport),
}

/// Owns a host editor plus the edit and recommendation queues built on it.
///
/// Single writer: every call runs to completion synchronously against the
/// owned editor.
#[derive(Debug)]
pub struct ReviewSession<E: Editor> {
    editor: E,
    author: String,
    stamp_dates: bool,
    edits: EditReview,
    recommendations: RecommendationReview,
    /// Groups the agent was last shown
    groups: Option<Vec<GroupedChange>>,
}

impl<E: Editor> ReviewSession<E> {
    pub fn new(editor: E, author: impl Into<String>, stamp_dates: bool, advance: bool) -> Self {
        Self {
            editor,
            author: author.into(),
            stamp_dates,
            edits: EditReview::new(advance),
            recommendations: RecommendationReview::new(advance),
            groups: None,
        }
    }

    pub fn from_config(editor: E, config: &Config) -> Self {
        Self::new(
            editor,
            config.author.clone(),
            config.stamp_dates,
            config.review.advance_on_resolve,
        )
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn into_editor(self) -> E {
        self.editor
    }

    pub fn edit_review(&self) -> &EditReview {
        &self.edits
    }

    pub fn recommendation_review(&self) -> &RecommendationReview {
        &self.recommendations
    }

    /// Attribution for marks created now
    pub fn attribution(&self) -> Attribution {
        if self.stamp_dates {
            Attribution::now(self.author.clone())
        } else {
            Attribution::undated(self.author.clone())
        }
    }

    pub fn clean_text(&self) -> CleanTextIndex {
        CleanTextIndex::from_editor(&self.editor)
    }

    pub fn tracked_changes(&self) -> Vec<TrackedChange> {
        scan_tracked_changes(&self.editor.read_paragraphs())
    }

    pub fn current_groups(&self) -> Vec<GroupedChange> {
        group_changes(self.tracked_changes())
    }

    pub fn edit_request(&self) -> EditRequest {
        EditRequest::from_index(&self.clean_text())
    }

    /// Snapshot the current review units and describe them for the agent
    pub fn review_request(&mut self) -> ReviewRequest {
        let groups = self.current_groups();
        let request = ReviewRequest::from_groups(&groups);
        self.groups = Some(groups);
        request
    }

    /// Parse and apply a raw agent reply. Nothing is applied when parsing fails.
    pub fn apply_agent_response(&mut self, raw: Option<&str>) -> Result<AgentOutcome, SessionError> {
        let outcome = match parse_response(raw)? {
            AgentResponse::Message(message) => AgentOutcome::Message(message),
            AgentResponse::Edits(edits) => AgentOutcome::Edits(self.apply_proposed_edits(&edits)),
            AgentResponse::Recommendations(recommendations) => {
                AgentOutcome::Recommendations(self.ingest_recommendations(recommendations))
            }
        };
        Ok(outcome)
    }

    /// Reconcile edits and queue the resulting word changes for review
    pub fn apply_proposed_edits(&mut self, edits: &[ProposedEdit]) -> ReconcileOutcome {
        let attribution = self.attribution();
        let outcome = apply_proposed_edits(&mut self.editor, edits, &attribution);
        self.edits.push_changes(outcome.changes.iter().cloned());
        outcome
    }

    /// Bind a batch to the groups the agent was shown
    pub fn ingest_recommendations(&mut self, recommendations: Vec<Recommendation>) -> IngestReport {
        let groups = match self.groups.take() {
            Some(groups) => groups,
            None => self.current_groups(),
        };
        self.recommendations.ingest(recommendations, &groups)
    }

    pub fn accept_unit(&mut self, index: usize) -> Result<EditResolution, ReviewError> {
        self.edits.accept(&mut self.editor, index)
    }

    /// Resolve as rejected, leaving the document as it is
    pub fn reject_unit(&mut self, index: usize) -> Result<EditResolution, ReviewError> {
        self.edits.reject(index)
    }

    /// Reject the unit's marks in the document, restoring what they replaced
    pub fn revert_unit(&mut self, index: usize) -> Result<EditResolution, ReviewError> {
        self.edits.revert(&mut self.editor, index)
    }

    pub fn keep_unit(&mut self, index: usize) -> Result<EditResolution, ReviewError> {
        self.edits.keep(index)
    }

    pub fn apply_recommendation(
        &mut self,
        index: usize,
    ) -> Result<RecommendationResolution, ReviewError> {
        self.recommendations.apply(&mut self.editor, index)
    }

    pub fn discard_recommendation(
        &mut self,
        index: usize,
    ) -> Result<RecommendationResolution, ReviewError> {
        self.recommendations.discard(index)
    }

    pub fn apply_all_recommendations(&mut self) -> Result<ApplyAllReport, ReviewError> {
        self.recommendations.apply_all(&mut self.editor)
    }

    pub fn next_pending_unit(&self, current: Option<usize>) -> Option<usize> {
        self.edits.next_pending(current)
    }

    pub fn next_pending_recommendation(&self, current: Option<usize>) -> Option<usize> {
        self.recommendations.next_pending(current)
    }
}
