pub mod ids;
pub mod paragraph;
pub mod run;
pub mod tracked_change;

pub use ids::{ChangeId, ParagraphId};
pub use paragraph::{BlockKind, Paragraph};
pub use run::{Attribution, Mark, MarkKind, Run};
pub use tracked_change::{TrackedChange, scan_tracked_changes};
