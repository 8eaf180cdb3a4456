use serde::Serialize;

use crate::editing::Editor;
use crate::models::{BlockKind, Paragraph, ParagraphId};

/// Clean text of one block with its real bounds at extraction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanParagraph {
    pub paragraph_id: ParagraphId,
    pub kind: BlockKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Ordered clean-text view of a whole document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CleanTextIndex {
    paragraphs: Vec<CleanParagraph>,
}

impl CleanTextIndex {
    pub fn extract(paragraphs: &[Paragraph]) -> Self {
        let paragraphs = paragraphs
            .iter()
            .map(|paragraph| CleanParagraph {
                paragraph_id: paragraph.id.clone(),
                kind: paragraph.kind,
                text: paragraph.clean_text(),
                start: paragraph.start,
                end: paragraph.end,
            })
            .collect();
        Self { paragraphs }
    }

    pub fn from_editor<E: Editor + ?Sized>(editor: &E) -> Self {
        Self::extract(&editor.read_paragraphs())
    }

    pub fn get(&self, id: &ParagraphId) -> Option<&CleanParagraph> {
        self.paragraphs.iter().find(|p| &p.paragraph_id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CleanParagraph> {
        self.paragraphs.iter()
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Clean text of every block joined with newlines
    pub fn full_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
