// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use nebula_orchestrator::config::ChunkingConfig;
use nebula_orchestrator::errors::ConfigurationError;
use nebula_orchestrator::rag::chunker::{chunk_document, chunk_text, expected_chunk_count};

fn words(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("word{}", i)).collect()
}

/// Undo the overlap: first window whole, then only the words past the overlap
fn reconstruct(chunks: &[String], overlap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let tokens = chunk.split_whitespace().map(str::to_string);
        if i == 0 {
            out.extend(tokens);
        } else {
            out.extend(tokens.skip(overlap));
        }
    }
    out
}

#[test]
fn test_default_window_counts() {
    let config = ChunkingConfig::default();
    assert_eq!(config.window_words, 500);
    assert_eq!(config.overlap_words, 50);

    for n in [1, 49, 50, 450, 500, 501, 949, 950, 951, 1200, 5000] {
        let text = words(n).join(" ");
        let chunks = chunk_text(&text, &config).unwrap();
        assert_eq!(chunks.len(), expected_chunk_count(n, &config), "n = {}", n);
    }
}

#[test]
fn test_1200_words_gives_three_chunks() {
    let text = words(1200).join(" ");
    let chunks = chunk_text(&text, &ChunkingConfig::default()).unwrap();

    assert_eq!(chunks.len(), 3);
    let lens: Vec<usize> = chunks.iter().map(|c| c.split_whitespace().count()).collect();
    assert_eq!(lens, vec![500, 500, 300]);
    assert!(chunks[1].starts_with("word450 "));
    assert!(chunks[2].ends_with("word1199"));
}

#[test]
fn test_overlap_removal_reconstructs_text() {
    let config = ChunkingConfig::new(7, 3).unwrap();
    for n in [1, 3, 7, 8, 11, 12, 40] {
        let original = words(n);
        let chunks = chunk_text(&original.join(" "), &config).unwrap();
        assert_eq!(reconstruct(&chunks, config.overlap_words), original, "n = {}", n);
    }
}

#[test]
fn test_whitespace_is_normalized() {
    let config = ChunkingConfig::new(3, 1).unwrap();
    let chunks = chunk_text("a\n\nb\t c   d", &config).unwrap();
    assert_eq!(chunks, vec!["a b c", "c d"]);
}

#[test]
fn test_overlap_not_smaller_than_window_fails_fast() {
    let err = ChunkingConfig::new(50, 50).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::OverlapNotSmallerThanWindow {
            window: 50,
            overlap: 50
        }
    ));

    let bad = ChunkingConfig {
        window_words: 10,
        overlap_words: 20,
    };
    assert!(chunk_text("some words here", &bad).is_err());
}

#[test]
fn test_chunk_ids_are_sequential_per_document() {
    let config = ChunkingConfig::new(4, 1).unwrap();
    let chunks = chunk_document("notes.md", &words(10).join(" "), &config).unwrap();

    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.source, "notes.md");
        assert_eq!(chunk.chunk_id, i as u32);
    }
}

#[test]
fn test_chunking_is_deterministic() {
    let config = ChunkingConfig::new(5, 2).unwrap();
    let text = words(23).join(" ");
    assert_eq!(chunk_text(&text, &config).unwrap(), chunk_text(&text, &config).unwrap());
}
