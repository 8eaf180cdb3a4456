// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use redline_engine::{Attribution, BlockSeed, ChangeId, Document, Mark, MarkKind, Run};

const SENTENCE: &str = "The quick brown fox jumps over the lazy dog near the river bank. ";

/// Paragraph `i` of a generated document, with pending changes every third paragraph
#[allow(dead_code)]
pub fn generate_paragraph(i: usize, sentences: usize) -> BlockSeed {
    let by = Attribution::undated("reviewer");
    let body = SENTENCE.repeat(sentences);
    let runs = if i % 3 == 0 {
        vec![
            Run::settled(body.clone()),
            Run::marked(
                "struck words ",
                Mark::new(ChangeId::generate(), MarkKind::Deletion, &by),
            ),
            Run::marked(
                "added words ",
                Mark::new(ChangeId::generate(), MarkKind::Insertion, &by),
            ),
            Run::settled(body),
        ]
    } else {
        vec![Run::settled(body)]
    };
    BlockSeed::paragraph(runs).with_id(format!("p{i}"))
}

#[allow(dead_code)]
pub fn generate_document(paragraphs: usize, sentences: usize) -> Document {
    Document::from_blocks(
        (0..paragraphs)
            .map(|i| generate_paragraph(i, sentences))
            .collect(),
    )
}

/// Rewrite every fourth word of `text`
#[allow(dead_code)]
pub fn rewrite(text: &str) -> String {
    text.split(' ')
        .enumerate()
        .map(|(i, word)| if i % 4 == 1 { "swift" } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}
