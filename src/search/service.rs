// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web search orchestration
//!
//! Coordinates providers, caching, and rate limiting. Providers are tried in
//! priority order; key-less providers are skipped, and a transient failure from
//! one provider fails over to the next.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::brave::BraveSearchProvider;
use super::cache::SearchCache;
use super::config::SearchConfig;
use super::provider::SearchProvider;
use super::rate_limiter::SearchRateLimiter;
use super::serpapi::SerpApiProvider;
use super::types::{validate_query, SearchError, SearchResponse};

pub struct SearchService {
    providers: Vec<Box<dyn SearchProvider>>,
    cache: SearchCache,
    rate_limiter: SearchRateLimiter,
    config: SearchConfig,
}

impl SearchService {
    /// Create a search service with the providers that have credentials
    pub fn new(config: SearchConfig) -> Self {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();

        if let Some(ref api_key) = config.providers.serpapi_api_key {
            providers.push(Box::new(SerpApiProvider::new(api_key.clone(), timeout)));
            debug!("SerpAPI provider enabled");
        }

        if let Some(ref api_key) = config.providers.brave_api_key {
            providers.push(Box::new(BraveSearchProvider::new(api_key.clone(), timeout)));
            debug!("Brave Search provider enabled");
        }

        Self::with_providers(config, providers)
    }

    /// Create a search service over explicit providers
    pub fn with_providers(config: SearchConfig, mut providers: Vec<Box<dyn SearchProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());

        let cache = SearchCache::new(config.cache_ttl_secs, config.cache_max_entries);
        let rate_limiter = SearchRateLimiter::new(config.rate_limit_per_minute);

        let service = Self {
            providers,
            cache,
            rate_limiter,
            config,
        };
        debug!("Web search failover order: {:?}", service.available_providers());
        service
    }

    /// Search with failover
    ///
    /// # Returns
    /// * `Err(SearchError::NoApiKey)` - no provider has credentials
    /// * `Err(e)` - every available provider failed; `e` is the last failure
    pub async fn search(&self, query: &str, num_results: usize) -> Result<SearchResponse, SearchError> {
        if !self.config.enabled {
            return Err(SearchError::SearchDisabled);
        }
        let query = validate_query(query)?;

        if !self.has_available_provider() {
            return Err(SearchError::NoApiKey {
                provider: "web search".to_string(),
            });
        }

        if let Some((results, provider)) = self.cache.get(query, num_results) {
            debug!("Cache hit for query: {}", query);
            return Ok(SearchResponse {
                query: query.to_string(),
                result_count: results.len(),
                results,
                search_time_ms: 0,
                provider,
                cached: true,
            });
        }

        self.rate_limiter.check()?;

        let start = Instant::now();
        let timeout = Duration::from_millis(self.config.request_timeout_ms);
        let mut last_error = None;

        for provider in self.providers.iter().filter(|p| p.is_available()) {
            debug!("Trying search provider: {}", provider.name());

            let outcome = match tokio::time::timeout(timeout, provider.search(query, num_results)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SearchError::Timeout {
                    timeout_ms: self.config.request_timeout_ms,
                }),
            };

            match outcome {
                Ok(mut results) => {
                    results.truncate(num_results);
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    self.cache.insert(query, num_results, &results, provider.name());

                    info!(
                        "Search complete: {} results from {} in {}ms",
                        results.len(),
                        provider.name(),
                        elapsed_ms
                    );

                    return Ok(SearchResponse {
                        query: query.to_string(),
                        result_count: results.len(),
                        results,
                        search_time_ms: elapsed_ms,
                        provider: provider.name().to_string(),
                        cached: false,
                    });
                }
                Err(e) if e.should_failover() => {
                    warn!("Search provider {} failed: {}, trying next", provider.name(), e);
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Search provider {} failed: {}", provider.name(), e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or(SearchError::ProviderUnavailable {
            provider: "all".to_string(),
        }))
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn has_available_provider(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    /// Names of providers with credentials, in failover order
    pub fn available_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name())
            .collect()
    }

    #[cfg(test)]
    pub fn cache_stats(&self) -> super::cache::CacheStats {
        self.cache.stats()
    }
}
