// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Brave Search, the failover web provider behind SerpAPI

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::provider::SearchProvider;
use super::types::{SearchError, SearchResult};

const BRAVE_API_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Brave caps `count` at 20 per request
const MAX_COUNT: usize = 20;

pub struct BraveSearchProvider {
    api_key: String,
    client: Client,
    timeout_ms: u64,
}

impl BraveSearchProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

/// Map a non-success status to the error the failover loop acts on
///
/// A rejected subscription token counts as missing credentials, so the service
/// moves on instead of surfacing a hard error.
fn status_error(status: StatusCode, body: String) -> SearchError {
    match status.as_u16() {
        429 => SearchError::RateLimited {
            retry_after_secs: 60,
        },
        401 | 403 => SearchError::NoApiKey {
            provider: "brave".to_string(),
        },
        code => SearchError::ApiError {
            status: code,
            message: body,
        },
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey {
                provider: "brave".to_string(),
            });
        }

        let count = num_results.min(MAX_COUNT).to_string();
        let response = self
            .client
            .get(BRAVE_API_URL)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let data: BraveResponse = response.json().await.map_err(|e| SearchError::ApiError {
            status: 0,
            message: format!("JSON parse error: {}", e),
        })?;

        Ok(data.into_results(num_results))
    }

    fn name(&self) -> &'static str {
        "brave"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn priority(&self) -> u8 {
        20
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    age: Option<String>,
}

impl BraveResponse {
    /// Normalize into the shape SerpAPI results take
    fn into_results(self, limit: usize) -> Vec<SearchResult> {
        self.web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                snippet: if r.description.is_empty() {
                    "No description available.".to_string()
                } else {
                    r.description
                },
                published_date: r.age,
                source: "brave".to_string(),
            })
            .collect()
    }
}
