use std::ops::Range;

use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

/// Untracked buffer edits. Tracked edits are built from these plus marking.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteRange { range: Range<usize> },
    ReplaceRange { range: Range<usize>, text: String },
}

impl Cmd {
    /// The range of the current buffer this command consumes
    pub fn target(&self) -> Range<usize> {
        match self {
            Cmd::InsertText { at, .. } => *at..*at,
            Cmd::DeleteRange { range } | Cmd::ReplaceRange { range, .. } => range.clone(),
        }
    }
}

/// Compile a command into a delta against a buffer of `base_len` bytes
pub(crate) fn compile_command(base_len: usize, cmd: &Cmd) -> Delta<RopeInfo> {
    let mut builder = Builder::new(base_len);
    match cmd {
        Cmd::InsertText { at, text } => {
            builder.replace(*at..*at, Rope::from(text));
        }
        Cmd::DeleteRange { range } => {
            builder.delete(range.clone());
        }
        Cmd::ReplaceRange { range, text } => {
            builder.replace(range.clone(), Rope::from(text));
        }
    }
    builder.build()
}
