use pretty_assertions::assert_eq;
use recall_chunker::{Chunker, ChunkerConfig, ChunkerError, ChunkingMethod};
use std::path::Path;

fn sample_text() -> String {
    let mut text = String::new();
    for i in 0..120 {
        text.push_str(&format!(
            "Line {i}: the quick brown fox jumps over the lazy dog — naïve café {i}.\n"
        ));
        if i % 7 == 0 {
            text.push('\n');
        }
    }
    text
}

#[test]
fn fixed_chunking_is_deterministic_and_reconstructs_source() {
    let text = sample_text();
    let chunker = Chunker::new(ChunkerConfig::fixed(512, 128)).expect("valid policy");

    let first = chunker.chunk_str(&text, "doc", Path::new("sample.txt"));
    let second = chunker.chunk_str(&text, "doc", Path::new("sample.txt"));
    assert_eq!(first, second);
    assert!(first.len() > 2, "expected several windows, got {}", first.len());

    let mut rebuilt: String = first[0].content.clone();
    for chunk in &first[1..] {
        rebuilt.extend(chunk.content.chars().skip(128));
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn fixed_chunks_overlap_by_exactly_the_configured_amount() {
    let text = sample_text();
    let chunker = Chunker::new(ChunkerConfig::fixed(512, 128)).expect("valid policy");
    let chunks = chunker.chunk_str(&text, "doc", Path::new("sample.txt"));

    for pair in chunks.windows(2) {
        let prev: Vec<char> = pair[0].content.chars().collect();
        let next: Vec<char> = pair[1].content.chars().collect();
        assert_eq!(prev.len(), 512);
        assert_eq!(&prev[prev.len() - 128..], &next[..128]);
    }
}

#[test]
fn short_sentences_produce_overlapping_chunks() {
    let text = "The sky is blue. Grass is green.\n";
    let chunker = Chunker::new(ChunkerConfig::fixed(20, 5)).expect("valid policy");
    let chunks = chunker.chunk_str(text, "doc", Path::new("colors.txt"));

    assert!(chunks.len() >= 2);
    assert!(chunks.iter().any(|c| c.content.contains("Grass is green.")));
    let tail_of_first: String = chunks[0].content.chars().skip(15).collect();
    let head_of_second: String = chunks[1].content.chars().take(5).collect();
    assert_eq!(tail_of_first, head_of_second);
}

#[test]
fn degenerate_fixed_policy_is_a_configuration_error() {
    for overlap in [20, 21, 100] {
        let err = Chunker::new(ChunkerConfig::fixed(20, overlap)).unwrap_err();
        assert!(matches!(err, ChunkerError::InvalidConfig(_)), "overlap {overlap}");
    }
}

#[test]
fn recursive_chunking_keeps_paragraphs_whole_when_they_fit() {
    let text = "Paragraph one is short.\n\nParagraph two is also short.\n\nThird.";
    let config = ChunkerConfig {
        method: ChunkingMethod::Recursive,
        chunk_size: 40,
        chunk_overlap: 0,
        min_chunk_size: 1,
    };
    let chunks = Chunker::new(config)
        .expect("valid policy")
        .chunk_str(text, "doc", Path::new("p.md"));

    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "Paragraph one is short.",
            "Paragraph two is also short.\n\nThird."
        ]
    );
}

#[test]
fn recursive_chunking_splits_long_paragraphs_on_sentences() {
    let text = "Alpha beta gamma. Delta epsilon zeta! Eta theta iota? Kappa lambda mu.";
    let chunks = Chunker::new(ChunkerConfig::recursive(36, 0))
        .expect("valid policy")
        .chunk_str(text, "doc", Path::new("s.txt"));

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(
            chunk.content.ends_with(['.', '!', '?']),
            "chunk should end on a sentence boundary: {:?}",
            chunk.content
        );
    }
}
