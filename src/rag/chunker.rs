// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Word-window chunking
//!
//! Splits extracted document text into overlapping windows of whitespace-separated
//! words. Window `k` starts at word `k * (window - overlap)`; the last window may be
//! shorter and ends exactly at the final word.

use crate::config::ChunkingConfig;
use crate::errors::ConfigurationError;
use crate::vector::types::DocumentChunk;

/// Split `text` into overlapping word windows
///
/// # Returns
/// * `Ok(chunks)` - empty only when `text` has no words
/// * `Err(ConfigurationError)` - window is zero or overlap is not smaller than window
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, ConfigurationError> {
    config.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::new();
    if words.is_empty() {
        return Ok(chunks);
    }

    let stride = config.stride();
    let mut start = 0;
    loop {
        let end = (start + config.window_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Chunk one document's text into sequenced `DocumentChunk`s
pub fn chunk_document(
    source: &str,
    text: &str,
    config: &ChunkingConfig,
) -> Result<Vec<DocumentChunk>, ConfigurationError> {
    Ok(chunk_text(text, config)?
        .into_iter()
        .enumerate()
        .map(|(sequence, text)| DocumentChunk {
            source: source.to_string(),
            chunk_id: sequence as u32,
            text,
        })
        .collect())
}

/// Expected chunk count for `words` words
pub fn expected_chunk_count(words: usize, config: &ChunkingConfig) -> usize {
    if words == 0 {
        0
    } else if words <= config.overlap_words {
        1
    } else {
        let stride = config.stride();
        (words - config.overlap_words + stride - 1) / stride
    }
}
