//! Payloads exchanged with the proposing/review agent.
//!
//! Transport lives outside this crate: callers render a request, hand it to
//! whatever generation service they use, and pass the raw reply (or `None`
//! if the call failed) to [`parse_response`].

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::ParagraphId;
use crate::tracking::{CleanTextIndex, GroupedChange, ProposedEdit, Recommendation};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("agent request failed before returning a result")]
    UpstreamFailure,
    #[error("malformed agent output: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphText {
    pub paragraph_id: ParagraphId,
    pub text: String,
}

/// Edit mode: the document's clean text, one entry per block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditRequest {
    pub paragraphs: Vec<ParagraphText>,
}

impl EditRequest {
    pub fn from_index(index: &CleanTextIndex) -> Self {
        let paragraphs = index
            .iter()
            .map(|p| ParagraphText {
                paragraph_id: p.paragraph_id.clone(),
                text: p.text.clone(),
            })
            .collect();
        Self { paragraphs }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain listing for prompts, one `[id] text` line per block
    pub fn render(&self) -> String {
        let mut out = String::new();
        for p in &self.paragraphs {
            let _ = writeln!(out, "[{}] {}", p.paragraph_id, p.text);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub index: usize,
    pub deleted_text: String,
    pub inserted_text: String,
    pub author: String,
}

/// Review mode: numbered summaries of the current review units
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRequest {
    pub changes: Vec<ChangeSummary>,
}

impl ReviewRequest {
    pub fn from_groups(groups: &[GroupedChange]) -> Self {
        let changes = groups
            .iter()
            .enumerate()
            .map(|(index, group)| ChangeSummary {
                index,
                deleted_text: group.deleted_text.clone(),
                inserted_text: group.inserted_text.clone(),
                author: group.author.clone(),
            })
            .collect();
        Self { changes }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for change in &self.changes {
            let _ = write!(out, "{}. by {}:", change.index, change.author);
            if !change.deleted_text.is_empty() {
                let _ = write!(out, " deleted {:?}", change.deleted_text);
            }
            if !change.inserted_text.is_empty() {
                let _ = write!(out, " inserted {:?}", change.inserted_text);
            }
            out.push('\n');
        }
        out
    }
}

/// What the agent sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentResponse {
    Message(String),
    Edits(Vec<ProposedEdit>),
    Recommendations(Vec<Recommendation>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResponse {
    message: Option<String>,
    edits: Option<Vec<ProposedEdit>>,
    recommendations: Option<Vec<Recommendation>>,
}

/// Parse a raw agent reply. `None` means the upstream call produced nothing.
///
/// The reply must be a JSON object with exactly one of `message`, `edits` or
/// `recommendations`, optionally wrapped in a Markdown code fence.
pub fn parse_response(raw: Option<&str>) -> Result<AgentResponse, AgentError> {
    let raw = raw.ok_or(AgentError::UpstreamFailure)?;
    let body = strip_code_fence(raw);

    let parsed: RawResponse =
        serde_json::from_str(body).map_err(|err| AgentError::Malformed(err.to_string()))?;

    let response = match (parsed.message, parsed.edits, parsed.recommendations) {
        (Some(message), None, None) => AgentResponse::Message(message),
        (None, Some(edits), None) => {
            if let Some(edit) = edits.iter().find(|e| e.paragraph_id.as_str().is_empty()) {
                return Err(AgentError::Malformed(format!(
                    "edit with empty paragraph id (new text {:?})",
                    edit.new_text
                )));
            }
            AgentResponse::Edits(edits)
        }
        (None, None, Some(recommendations)) => AgentResponse::Recommendations(recommendations),
        _ => {
            return Err(AgentError::Malformed(
                "expected exactly one of `message`, `edits` or `recommendations`".to_string(),
            ));
        }
    };
    Ok(response)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
