// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Evidence and retrieval result types shared by all specialists

use serde::{Deserialize, Serialize};
use std::fmt;

/// The retrieval strategies the router can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistKind {
    DocumentRetriever,
    WebSearch,
    LiteratureSearch,
}

impl SpecialistKind {
    /// Stable identifier used in responses and traces
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialistKind::DocumentRetriever => "document_retriever",
            SpecialistKind::WebSearch => "web_search",
            SpecialistKind::LiteratureSearch => "literature_search",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SpecialistKind::DocumentRetriever => "Document Retriever",
            SpecialistKind::WebSearch => "Web Search Specialist",
            SpecialistKind::LiteratureSearch => "Literature Search Specialist",
        }
    }
}

impl fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source tag for results produced without a live provider
pub const SOURCE_FALLBACK: &str = "fallback";
/// Source tag for results whose provider call failed
pub const SOURCE_ERROR: &str = "error";

/// How a specialist's call went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    Ok,
    /// No live provider (missing credential, disabled); placeholder evidence
    Degraded { reason: String },
    /// The provider was called and failed
    Error { detail: String },
}

/// One ranked piece of evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidenceItem {
    Document {
        source: String,
        chunk_id: u32,
        text: String,
        /// Euclidean distance; lower is closer
        score: f32,
    },
    Web {
        title: String,
        snippet: String,
        link: String,
    },
    Literature {
        id: String,
        title: String,
        published_date: String,
        authors: Vec<String>,
        abstract_excerpt: String,
    },
}

/// Identifying fields of an evidence item, recorded in the trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Document { source: String, chunk_id: u32 },
    Web { title: String, link: String },
    Literature { id: String, title: String },
}

impl EvidenceItem {
    pub fn provenance(&self) -> Provenance {
        match self {
            EvidenceItem::Document {
                source, chunk_id, ..
            } => Provenance::Document {
                source: source.clone(),
                chunk_id: *chunk_id,
            },
            EvidenceItem::Web { title, link, .. } => Provenance::Web {
                title: title.clone(),
                link: link.clone(),
            },
            EvidenceItem::Literature { id, title, .. } => Provenance::Literature {
                id: id.clone(),
                title: title.clone(),
            },
        }
    }

    /// Context block entry; `position` is 1-based
    pub fn context_entry(&self, position: usize) -> String {
        match self {
            EvidenceItem::Document { source, text, .. } => {
                format!("[Excerpt {} from {}]:\n{}\n", position, source, text)
            }
            EvidenceItem::Web {
                title,
                snippet,
                link,
            } => format!("[Web Result: {}]\n{}\nSource: {}\n", title, snippet, link),
            EvidenceItem::Literature {
                title,
                published_date,
                authors,
                abstract_excerpt,
                ..
            } => {
                let date: String = published_date.chars().take(10).collect();
                let mut entry = format!("- {} ({}): {}", title, date, abstract_excerpt);
                if !authors.is_empty() {
                    entry.push_str(&format!("\n  Authors: {}", authors.join(", ")));
                }
                entry.push('\n');
                entry
            }
        }
    }
}

/// Context block from the first `limit` evidence items
pub fn format_context(evidence: &[EvidenceItem], limit: usize) -> String {
    evidence
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, item)| item.context_entry(i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What a specialist hands back to the aggregator; never an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub specialist: SpecialistKind,
    /// Provider that answered, or `fallback` / `error`
    pub source: String,
    pub outcome: RetrievalOutcome,
    pub evidence: Vec<EvidenceItem>,
    /// Shown instead of a synthesized passage when there is no evidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl RetrievalResult {
    pub fn ok(specialist: SpecialistKind, source: impl Into<String>, evidence: Vec<EvidenceItem>) -> Self {
        Self {
            specialist,
            source: source.into(),
            outcome: RetrievalOutcome::Ok,
            evidence,
            notice: None,
        }
    }

    pub fn fallback(specialist: SpecialistKind, reason: impl Into<String>, placeholder: EvidenceItem) -> Self {
        Self {
            specialist,
            source: SOURCE_FALLBACK.to_string(),
            outcome: RetrievalOutcome::Degraded {
                reason: reason.into(),
            },
            evidence: vec![placeholder],
            notice: None,
        }
    }

    pub fn error(specialist: SpecialistKind, detail: impl Into<String>, evidence: Vec<EvidenceItem>) -> Self {
        Self {
            specialist,
            source: SOURCE_ERROR.to_string(),
            outcome: RetrievalOutcome::Error {
                detail: detail.into(),
            },
            evidence,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == RetrievalOutcome::Ok
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, RetrievalOutcome::Degraded { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, RetrievalOutcome::Error { .. })
    }
}
