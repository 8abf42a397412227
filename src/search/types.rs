// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for web and literature search

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single search result from a web search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Source provider (e.g., "serpapi", "brave")
    pub source: String,
}

/// Response from a web search operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    /// Time taken for the search in milliseconds
    pub search_time_ms: u64,
    /// Provider that returned the results
    pub provider: String,
    /// Whether the result was from cache
    pub cached: bool,
    pub result_count: usize,
}

/// One paper from a literature index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiteratureRecord {
    /// Stable entry id (abs URL for arXiv)
    pub id: String,
    pub title: String,
    /// RFC3339 submission timestamp
    pub published: String,
    pub authors: Vec<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rate limited locally or by the provider
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Non-2xx response, or a body that could not be decoded
    #[error("Search API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Search timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Provider unavailable: {provider}")]
    ProviderUnavailable { provider: String },

    /// No API key configured for the provider
    #[error("No API key configured for {provider}")]
    NoApiKey { provider: String },

    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Search disabled")]
    SearchDisabled,
}

impl SearchError {
    /// Missing credentials or a disabled provider, as opposed to a failed call
    pub fn is_unconfigured(&self) -> bool {
        matches!(
            self,
            SearchError::NoApiKey { .. } | SearchError::SearchDisabled
        )
    }

    /// Worth trying the next provider
    pub fn should_failover(&self) -> bool {
        match self {
            SearchError::RateLimited { .. }
            | SearchError::Timeout { .. }
            | SearchError::ProviderUnavailable { .. }
            | SearchError::NoApiKey { .. } => true,
            SearchError::ApiError { status, .. } => *status == 0 || *status == 429 || *status >= 500,
            SearchError::InvalidQuery { .. } | SearchError::SearchDisabled => false,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            SearchError::Timeout { timeout_ms }
        } else {
            SearchError::ApiError {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }
}

/// Reject empty queries before any provider is called
pub fn validate_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery {
            reason: "query is empty".to_string(),
        });
    }
    Ok(trimmed)
}
