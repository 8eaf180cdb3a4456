use std::collections::HashMap;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChangeId, MarkKind, Paragraph, ParagraphId};

/// One mark instance found in the real document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChange {
    pub id: ChangeId,
    pub kind: MarkKind,
    pub text: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub paragraph_id: ParagraphId,
    /// Real document range `[pos, end_pos)`
    pub range: Range<usize>,
}

/// Derive tracked changes from the runs of the given paragraphs.
///
/// Runs sharing one mark id collapse into a single change whose range spans
/// from the first piece to the last and whose text is the pieces' texts in
/// document order. Output is ordered by first appearance.
pub fn scan_tracked_changes(paragraphs: &[Paragraph]) -> Vec<TrackedChange> {
    let mut changes: Vec<TrackedChange> = Vec::new();
    let mut by_id: HashMap<ChangeId, usize> = HashMap::new();

    for paragraph in paragraphs {
        let mut pos = paragraph.start;
        for run in &paragraph.runs {
            let run_range = pos..pos + run.text.len();
            pos = run_range.end;

            let Some(mark) = &run.mark else {
                continue;
            };

            match by_id.get(&mark.id) {
                Some(&index) => {
                    let change = &mut changes[index];
                    change.text.push_str(&run.text);
                    change.range.end = run_range.end;
                }
                None => {
                    by_id.insert(mark.id.clone(), changes.len());
                    changes.push(TrackedChange {
                        id: mark.id.clone(),
                        kind: mark.kind,
                        text: run.text.clone(),
                        author: mark.author.clone(),
                        date: mark.date,
                        paragraph_id: paragraph.id.clone(),
                        range: run_range,
                    });
                }
            }
        }
    }

    changes
}
