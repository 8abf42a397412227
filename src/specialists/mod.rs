// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval specialists
//!
//! Each specialist maps a query to ranked evidence from one source. Provider
//! failures and missing credentials are folded into the returned
//! `RetrievalResult` so callers never branch on provider-specific errors.

pub mod document;
pub mod literature;
pub mod types;
pub mod web;

use async_trait::async_trait;

pub use document::DocumentRetriever;
pub use literature::LiteratureSearchSpecialist;
pub use types::{
    format_context, EvidenceItem, Provenance, RetrievalOutcome, RetrievalResult, SpecialistKind,
    SOURCE_ERROR, SOURCE_FALLBACK,
};
pub use web::WebSearchSpecialist;

#[async_trait]
pub trait Specialist: Send + Sync {
    fn kind(&self) -> SpecialistKind;

    /// Up to `top_k` ranked evidence items; never fails
    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult;
}
