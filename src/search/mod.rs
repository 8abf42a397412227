// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! External search collaborators
//!
//! - Web search providers (SerpAPI, Brave) behind `SearchProvider`, with priority
//!   failover, TTL caching and a shared rate limit in `SearchService`
//! - Literature index (arXiv) behind `LiteratureProvider`
//!
//! Absence of credentials is reported as `SearchError::NoApiKey`, a detectable
//! state the specialists turn into fallback results.

pub mod arxiv;
pub mod brave;
pub mod cache;
pub mod config;
pub mod provider;
pub mod rate_limiter;
pub mod serpapi;
pub mod service;
pub mod types;

pub use arxiv::ArxivProvider;
pub use config::{LiteratureConfig, SearchConfig};
pub use provider::{LiteratureProvider, SearchProvider};
pub use service::SearchService;
pub use types::{LiteratureRecord, SearchError, SearchResponse, SearchResult};
