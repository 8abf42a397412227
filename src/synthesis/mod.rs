// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text-generation collaborator
//!
//! `synthesize` always returns text. Failures come back as an error-annotated
//! passage so the aggregator never branches on provider errors.

pub mod chat;

use async_trait::async_trait;

pub use chat::ChatSynthesizer;

pub const EMPTY_COMPLETION: &str = "No summary generated.";

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Display name, e.g. "GROQ"
    fn provider(&self) -> &str;

    /// Whether a live backend is configured
    fn is_available(&self) -> bool;

    async fn synthesize(&self, query: &str, context: &str) -> String;
}

/// Passage used when no backend is configured; quotes the context verbatim
pub fn unavailable_passage(provider: &str, reason: &str, context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        format!("[{} synthesis unavailable: {}]", provider, reason)
    } else {
        format!(
            "[{} synthesis unavailable: {}]\nRetrieved context:\n{}",
            provider, reason, context
        )
    }
}
