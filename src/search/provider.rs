// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search provider trait definitions

use async_trait::async_trait;

use super::types::{LiteratureRecord, SearchError, SearchResult};

/// Trait for implementing web search providers
///
/// Multiple providers can be configured with automatic failover.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Perform a web search
    ///
    /// # Arguments
    /// * `query` - The search query string
    /// * `num_results` - Maximum number of results to return
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;

    /// Get the provider name for logging
    fn name(&self) -> &'static str;

    /// Check if the provider is available (has API key, etc.)
    fn is_available(&self) -> bool;

    /// Get provider priority (lower = preferred)
    fn priority(&self) -> u8 {
        100
    }
}

/// A scholarly index returning the newest matching papers first
#[async_trait]
pub trait LiteratureProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<LiteratureRecord>, SearchError>;

    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;
}
