// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! SerpAPI provider (Google engine)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::provider::SearchProvider;
use super::types::{SearchError, SearchResult};

const SERPAPI_URL: &str = "https://serpapi.com/search";

pub struct SerpApiProvider {
    api_key: String,
    client: Client,
    timeout_ms: u64,
}

impl SerpApiProvider {
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

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if self.api_key.is_empty() {
            return Err(SearchError::NoApiKey {
                provider: "serpapi".to_string(),
            });
        }

        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", &num_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.timeout_ms))?;

        let status = response.status();

        if status == 429 {
            return Err(SearchError::RateLimited {
                retry_after_secs: 60,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let data: SerpApiResponse = response.json().await.map_err(|e| SearchError::ApiError {
            status: 0,
            message: format!("JSON parse error: {}", e),
        })?;

        Ok(data.into_results(num_results))
    }

    fn name(&self) -> &'static str {
        "serpapi"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    date: Option<String>,
}

impl SerpApiResponse {
    fn into_results(self, limit: usize) -> Vec<SearchResult> {
        self.organic_results
            .into_iter()
            .take(limit)
            .map(|r| SearchResult {
                title: r.title.unwrap_or_else(|| "Untitled Result".to_string()),
                url: r.link.unwrap_or_default(),
                snippet: r
                    .snippet
                    .unwrap_or_else(|| "No description available.".to_string()),
                published_date: r.date,
                source: "serpapi".to_string(),
            })
            .collect()
    }
}
