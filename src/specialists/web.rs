// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Web search specialist

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{EvidenceItem, RetrievalResult, SpecialistKind};
use super::Specialist;
use crate::search::{SearchError, SearchService};

pub struct WebSearchSpecialist {
    service: Arc<SearchService>,
}

impl WebSearchSpecialist {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self { service }
    }

    fn placeholder(title: &str, snippet: String) -> EvidenceItem {
        EvidenceItem::Web {
            title: title.to_string(),
            snippet,
            link: String::new(),
        }
    }
}

#[async_trait]
impl Specialist for WebSearchSpecialist {
    fn kind(&self) -> SpecialistKind {
        SpecialistKind::WebSearch
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult {
        match self.service.search(query, top_k).await {
            Ok(response) if response.results.is_empty() => {
                RetrievalResult::ok(self.kind(), response.provider, Vec::new())
                    .with_notice("No web results found. Try another query.")
            }
            Ok(response) => {
                let evidence = response
                    .results
                    .into_iter()
                    .take(top_k)
                    .map(|r| EvidenceItem::Web {
                        title: r.title,
                        snippet: r.snippet,
                        link: r.url,
                    })
                    .collect();
                RetrievalResult::ok(self.kind(), response.provider, evidence)
            }
            Err(e) if e.is_unconfigured() => {
                info!("Web search unavailable, returning fallback: {}", e);
                RetrievalResult::fallback(
                    self.kind(),
                    e.to_string(),
                    Self::placeholder(
                        "No API key provided",
                        "Please set SERPAPI_KEY or BRAVE_API_KEY in the environment or .env for live web results."
                            .to_string(),
                    ),
                )
            }
            Err(e) => {
                warn!("Web search failed: {}", e);
                let placeholder = match &e {
                    SearchError::ApiError { status, .. } if *status != 0 => Self::placeholder(
                        "Web Search API Error",
                        format!("Error code: {}. Check API key or quota.", status),
                    ),
                    _ => Self::placeholder(
                        "Network or API Error",
                        format!("Error occurred: {}", e),
                    ),
                };
                RetrievalResult::error(self.kind(), e.to_string(), vec![placeholder])
            }
        }
    }
}
