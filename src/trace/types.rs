// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::router::RoutingDecision;
use crate::specialists::{Provenance, RetrievalOutcome, RetrievalResult, SpecialistKind};

/// Evidence reference tagged with the specialist that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub specialist: SpecialistKind,
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// Per-specialist summary of how retrieval went
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialistRecord {
    pub specialist: SpecialistKind,
    pub source: String,
    pub outcome: RetrievalOutcome,
    pub evidence_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl From<&RetrievalResult> for SpecialistRecord {
    fn from(result: &RetrievalResult) -> Self {
        Self {
            specialist: result.specialist,
            source: result.source.clone(),
            outcome: result.outcome.clone(),
            evidence_count: result.evidence.len(),
            notice: result.notice.clone(),
        }
    }
}

/// Audit record of one request; written once, never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub attachment: Option<String>,
    pub decision: RoutingDecision,
    pub specialists_invoked: Vec<SpecialistKind>,
    pub specialist_results: Vec<SpecialistRecord>,
    pub documents_retrieved: Vec<EvidenceRef>,
    pub answer: String,
}

impl Trace {
    pub fn new(
        input: &str,
        attachment: Option<String>,
        decision: RoutingDecision,
        results: &[RetrievalResult],
        answer: String,
    ) -> Self {
        let documents_retrieved = results
            .iter()
            .flat_map(|r| {
                r.evidence.iter().map(move |item| EvidenceRef {
                    specialist: r.specialist,
                    provenance: item.provenance(),
                })
            })
            .collect();

        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            input: input.to_string(),
            attachment,
            specialists_invoked: results.iter().map(|r| r.specialist).collect(),
            specialist_results: results.iter().map(SpecialistRecord::from).collect(),
            decision,
            documents_retrieved,
            answer,
        }
    }
}
