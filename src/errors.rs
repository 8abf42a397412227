// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the orchestration core
//!
//! - `ConfigurationError`: invalid settings, fatal before any specialist runs
//! - `IngestionError`: a single document could not be admitted or parsed
//! - `IndexConsistencyError`: persisted index does not match itself or the embedder
//! - `EmbeddingError`: the embedding collaborator failed or timed out
//! - `TraceError`: trace persistence failed (surfaced as a flag, never fatal)
//!
//! Provider failures (missing credential, upstream non-2xx, timeout) never show up
//! here: specialists fold them into degraded `RetrievalResult`s.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Overlap must leave the window a positive stride
    #[error("Chunk overlap ({overlap} words) must be smaller than the chunk window ({window} words)")]
    OverlapNotSmallerThanWindow { window: usize, overlap: usize },

    #[error("{field} must be greater than 0")]
    ZeroValue { field: &'static str },

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported document type '{extension}' for {path:?}")]
    UnsupportedType { path: PathBuf, extension: String },

    #[error("Document {path:?} is {size_bytes} bytes, limit is {limit_bytes} bytes")]
    TooLarge {
        path: PathBuf,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Failed to read document {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse document {path:?}: {reason}")]
    Unparsable { path: PathBuf, reason: String },

    #[error("Document {path:?} contains no extractable text")]
    EmptyText { path: PathBuf },

    /// Every candidate document for an index build failed
    #[error("No documents could be ingested for index '{index_name}' ({failed} failed)")]
    NothingIngested { index_name: String, failed: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexConsistencyError {
    #[error("Index '{index_name}' has {vectors} vectors but {chunks} chunk records")]
    LengthMismatch {
        index_name: String,
        vectors: usize,
        chunks: usize,
    },

    #[error("Index '{index_name}' expects {expected}D vectors, found {actual}D")]
    DimensionMismatch {
        index_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Index '{index_name}' was built with embedder '{built_with}', current embedder is '{current}'")]
    EmbedderMismatch {
        index_name: String,
        built_with: String,
        current: String,
    },

    #[error("Index '{index_name}' is corrupt: {reason}")]
    Corrupt { index_name: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("Embedding request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("Embedder produced {actual}D vector, expected {expected}D")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding model unavailable: {0}")]
    Model(String),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode trace: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid trace locator: {0}")]
    InvalidLocator(String),

    #[error("Trace not found: {0}")]
    NotFound(String),
}

/// Top-level error for orchestration operations
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    IndexConsistency(#[from] IndexConsistencyError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Index codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<bincode::Error> for OrchestratorError {
    fn from(err: bincode::Error) -> Self {
        OrchestratorError::Codec(err.to_string())
    }
}

impl OrchestratorError {
    /// Get error code for logging and trace records
    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::Configuration(_) => "CONFIGURATION_ERROR",
            OrchestratorError::Ingestion(_) => "INGESTION_ERROR",
            OrchestratorError::IndexConsistency(_) => "INDEX_CONSISTENCY_ERROR",
            OrchestratorError::Embedding(EmbeddingError::Timeout { .. }) => "EMBEDDING_TIMEOUT",
            OrchestratorError::Embedding(_) => "EMBEDDING_ERROR",
            OrchestratorError::Trace(_) => "TRACE_WRITE_ERROR",
            OrchestratorError::InvalidQuery(_) => "INVALID_QUERY",
            OrchestratorError::Codec(_) => "INDEX_CODEC_ERROR",
            OrchestratorError::Io(_) => "IO_ERROR",
            OrchestratorError::Json(_) => "JSON_ERROR",
        }
    }

    /// Check if this error is retryable at the collaborator boundary
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Embedding(EmbeddingError::Timeout { .. })
                | OrchestratorError::Embedding(EmbeddingError::Request(_))
        )
    }

    /// Fatal errors abort the request before any specialist runs
    pub fn is_fatal(&self) -> bool {
        matches!(self, OrchestratorError::Configuration(_))
    }
}
