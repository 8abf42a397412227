// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Literature search specialist

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{EvidenceItem, RetrievalResult, SpecialistKind};
use super::Specialist;
use crate::search::LiteratureProvider;

pub const NO_PAPERS_NOTICE: &str = "No relevant papers found.";

pub struct LiteratureSearchSpecialist {
    provider: Arc<dyn LiteratureProvider>,
}

impl LiteratureSearchSpecialist {
    pub fn new(provider: Arc<dyn LiteratureProvider>) -> Self {
        Self { provider }
    }

    fn placeholder(title: &str, text: String) -> EvidenceItem {
        EvidenceItem::Literature {
            id: String::new(),
            title: title.to_string(),
            published_date: String::new(),
            authors: Vec::new(),
            abstract_excerpt: text,
        }
    }

    fn unavailable(&self, reason: String) -> RetrievalResult {
        info!("Literature search unavailable, returning fallback: {}", reason);
        RetrievalResult::fallback(
            self.kind(),
            reason,
            Self::placeholder(
                "Literature search unavailable",
                "Set LITERATURE_SEARCH_ENABLED=true to query the literature index for recent papers."
                    .to_string(),
            ),
        )
    }
}

#[async_trait]
impl Specialist for LiteratureSearchSpecialist {
    fn kind(&self) -> SpecialistKind {
        SpecialistKind::LiteratureSearch
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult {
        if !self.provider.is_available() {
            return self.unavailable(format!("{} is disabled", self.provider.name()));
        }

        match self.provider.search(query, top_k).await {
            Ok(records) if records.is_empty() => {
                RetrievalResult::ok(self.kind(), self.provider.name(), Vec::new())
                    .with_notice(NO_PAPERS_NOTICE)
            }
            Ok(records) => {
                let evidence = records
                    .into_iter()
                    .take(top_k)
                    .map(|r| EvidenceItem::Literature {
                        id: r.id,
                        title: r.title,
                        published_date: r.published,
                        authors: r.authors,
                        abstract_excerpt: r.summary,
                    })
                    .collect();
                RetrievalResult::ok(self.kind(), self.provider.name(), evidence)
            }
            Err(e) if e.is_unconfigured() => self.unavailable(e.to_string()),
            Err(e) => {
                warn!("Literature search via {} failed: {}", self.provider.name(), e);
                RetrievalResult::error(
                    self.kind(),
                    e.to_string(),
                    vec![Self::placeholder(
                        "Literature Search Error",
                        format!("Error: {}", e),
                    )],
                )
            }
        }
    }
}
