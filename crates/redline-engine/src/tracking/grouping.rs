use std::ops::Range;

use serde::Serialize;

use crate::models::{ChangeId, MarkKind, ParagraphId, TrackedChange};

/// A review unit: tracked changes with no settled text between them
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedChange {
    pub deletion_ids: Vec<ChangeId>,
    pub insertion_ids: Vec<ChangeId>,
    pub deleted_text: String,
    pub inserted_text: String,
    /// Author of the first change in position order
    pub author: String,
    pub paragraph_id: ParagraphId,
    /// Real span from the first change's start to the furthest end seen
    pub range: Range<usize>,
}

impl GroupedChange {
    fn start(change: TrackedChange) -> Self {
        let mut group = Self {
            deletion_ids: Vec::new(),
            insertion_ids: Vec::new(),
            deleted_text: String::new(),
            inserted_text: String::new(),
            author: change.author.clone(),
            paragraph_id: change.paragraph_id.clone(),
            range: change.range.clone(),
        };
        group.extend(change);
        group
    }

    fn extend(&mut self, change: TrackedChange) {
        self.range.end = self.range.end.max(change.range.end);
        match change.kind {
            MarkKind::Deletion => {
                self.deletion_ids.push(change.id);
                self.deleted_text.push_str(&change.text);
            }
            MarkKind::Insertion => {
                self.insertion_ids.push(change.id);
                self.inserted_text.push_str(&change.text);
            }
        }
    }

    /// Deletion ids followed by insertion ids
    pub fn ids(&self) -> impl Iterator<Item = &ChangeId> {
        self.deletion_ids.iter().chain(self.insertion_ids.iter())
    }
}

/// Collapse tracked changes into review units in ascending position order.
///
/// A change starts a new unit only when its start lies strictly after the
/// furthest end seen in the current unit. Exact adjacency joins the unit.
pub fn group_changes(mut changes: Vec<TrackedChange>) -> Vec<GroupedChange> {
    changes.sort_by_key(|change| change.range.start);

    let mut groups: Vec<GroupedChange> = Vec::new();
    for change in changes {
        match groups.last_mut() {
            Some(current) if change.range.start <= current.range.end => current.extend(change),
            _ => groups.push(GroupedChange::start(change)),
        }
    }
    groups
}
