/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Ranges of newly inserted text, in post-edit coordinates
    pub changed: Vec<std::ops::Range<usize>>,
    pub version: u64,
}
