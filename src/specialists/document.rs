// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document retriever backed by the vector index store

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{EvidenceItem, RetrievalResult, SpecialistKind};
use super::Specialist;
use crate::vector::VectorIndexStore;

const SOURCE_INDEX: &str = "vector_index";

pub struct DocumentRetriever {
    store: Arc<VectorIndexStore>,
    index_name: String,
}

impl DocumentRetriever {
    pub fn new(store: Arc<VectorIndexStore>, index_name: impl Into<String>) -> Self {
        Self {
            store,
            index_name: index_name.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

#[async_trait]
impl Specialist for DocumentRetriever {
    fn kind(&self) -> SpecialistKind {
        SpecialistKind::DocumentRetriever
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult {
        match self.store.query(&self.index_name, query, top_k).await {
            Ok(hits) if hits.is_empty() => {
                debug!("Index '{}' returned no chunks", self.index_name);
                RetrievalResult::ok(self.kind(), SOURCE_INDEX, Vec::new())
                    .with_notice("No indexed document content is available for this query.")
            }
            Ok(hits) => {
                let evidence = hits
                    .into_iter()
                    .map(|hit| EvidenceItem::Document {
                        source: hit.chunk.source,
                        chunk_id: hit.chunk.chunk_id,
                        text: hit.chunk.text,
                        score: hit.distance,
                    })
                    .collect();
                RetrievalResult::ok(self.kind(), SOURCE_INDEX, evidence)
            }
            Err(e) => {
                warn!(
                    "Document retrieval against '{}' failed [{}]: {}",
                    self.index_name,
                    e.error_code(),
                    e
                );
                RetrievalResult::error(self.kind(), e.to_string(), Vec::new())
            }
        }
    }
}
