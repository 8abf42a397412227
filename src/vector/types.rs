// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persisted index records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A word-window slice of one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentChunk {
    /// Source document identifier (file name)
    pub source: String,
    /// Sequence index within the source document
    pub chunk_id: u32,
    pub text: String,
}

/// One entry of the metadata artifact, aligned by position with the vector artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    #[serde(flatten)]
    pub chunk: DocumentChunk,
    /// SHA-256 of the source document the chunk came from
    pub document_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedDocument {
    pub source: String,
    pub sha256: String,
    pub chunk_count: usize,
}

/// Written last inside a generation; describes both artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub index_name: String,
    pub generation: String,
    /// `Embedder::model_id()` at build time
    pub embedder: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub documents: Vec<IndexedDocument>,
    pub built_at: DateTime<Utc>,
}

/// A document that was skipped during a build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestionFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of `VectorIndexStore::build`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub index_name: String,
    pub generation: String,
    pub chunk_count: usize,
    pub dimension: usize,
    /// Sources that were indexed, in build order
    pub documents: Vec<String>,
    /// Documents skipped, with reasons; never silently dropped
    pub failures: Vec<IngestionFailure>,
}

impl BuildReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub index_name: String,
    pub ready: bool,
    pub generation: Option<String>,
    pub embedder: Option<String>,
    pub dimension: Option<usize>,
    pub chunk_count: usize,
    pub built_at: Option<DateTime<Utc>>,
}

/// One nearest-neighbour result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub chunk: DocumentChunk,
    /// Euclidean distance to the query embedding; lower is closer
    pub distance: f32,
}
