/*!
 * # Tracking: clean text, diffing and reconciliation
 *
 * An agent only ever sees clean text: deletions hidden, insertions shown as
 * final text. Everything here translates between that view and the real
 * document, which still holds pending deletions in place.
 *
 * - [`PositionMap`]: per-paragraph snapshot mapping clean offsets to real ones
 * - [`CleanTextIndex`]: what gets shown to an agent
 * - [`diff_words`]: word-level minimal edit script
 * - [`group_changes`]: contiguous tracked changes as review units
 * - [`apply_proposed_edits`]: proposed text back onto the document as new marks
 * - [`EditReview`] / [`RecommendationReview`]: per-unit review lifecycles
 */

pub mod clean_text;
pub mod diff;
pub mod grouping;
pub mod position_map;
pub mod reconcile;
pub mod review;

pub use clean_text::{CleanParagraph, CleanTextIndex};
pub use diff::{ChunkKind, DiffChunk, diff_words, tokenize};
pub use grouping::{GroupedChange, group_changes};
pub use position_map::{PositionMap, Segment};
pub use reconcile::{
    FailedEdit, ProposedEdit, ReconcileOutcome, WordChange, apply_proposed_edits,
    reconcile_paragraph,
};
pub use review::{
    ApplyAllReport, ApplyOutcome, Decision, EditResolution, EditReview, EditStatus, EditUnit,
    IngestReport, Recommendation, RecommendationResolution, RecommendationReview,
    RecommendationStatus, RecommendationUnit, ReviewError,
};
