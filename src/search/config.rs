// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web and literature search

use std::env;

pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Configuration for web search functionality
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Whether web search is enabled
    pub enabled: bool,
    /// Provider-specific configuration
    pub providers: SearchProviderConfig,
    /// Cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Maximum cached queries
    pub cache_max_entries: usize,
    /// Rate limit (requests per minute)
    pub rate_limit_per_minute: u32,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default)]
pub struct SearchProviderConfig {
    /// SerpAPI key (Google engine)
    pub serpapi_api_key: Option<String>,
    /// Brave Search API key
    pub brave_api_key: Option<String>,
}

/// Configuration for the literature index
#[derive(Debug, Clone)]
pub struct LiteratureConfig {
    /// Whether literature search is enabled
    pub enabled: bool,
    /// Atom query endpoint
    pub api_url: String,
    /// Drop papers submitted more than this many days ago
    pub max_age_days: Option<u32>,
    /// Abstract excerpt length in characters
    pub abstract_chars: usize,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl SearchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("WEB_SEARCH_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            providers: SearchProviderConfig {
                serpapi_api_key: env::var("SERPAPI_KEY").ok().filter(|k| !k.is_empty()),
                brave_api_key: env::var("BRAVE_API_KEY").ok().filter(|k| !k.is_empty()),
            },
            cache_ttl_secs: env::var("SEARCH_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            cache_max_entries: 1000,
            rate_limit_per_minute: env::var("SEARCH_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            request_timeout_ms: env::var("SEARCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20_000),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_ttl_secs == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Check if any search provider has a credential
    pub fn has_any_provider(&self) -> bool {
        self.providers.serpapi_api_key.is_some() || self.providers.brave_api_key.is_some()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: SearchProviderConfig::default(),
            cache_ttl_secs: 3600,
            cache_max_entries: 1000,
            rate_limit_per_minute: 60,
            request_timeout_ms: 20_000,
        }
    }
}

impl LiteratureConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("LITERATURE_SEARCH_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            api_url: env::var("LITERATURE_API_URL").unwrap_or_else(|_| ARXIV_API_URL.to_string()),
            max_age_days: env::var("LITERATURE_MAX_AGE_DAYS")
                .ok()
                .and_then(|v| v.parse().ok()),
            abstract_chars: 800,
            request_timeout_ms: env::var("SEARCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20_000),
        }
    }
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: ARXIV_API_URL.to_string(),
            max_age_days: None,
            abstract_chars: 800,
            request_timeout_ms: 20_000,
        }
    }
}
