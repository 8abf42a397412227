// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod aggregator;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod rag;
pub mod router;
pub mod search;
pub mod specialists;
pub mod synthesis;
pub mod trace;
pub mod utils;
pub mod vector;

// Re-export main types
pub use aggregator::{
    Collaborators, EnvironmentReport, Orchestrator, Query, QueryResponse, UploadReceipt,
    NO_RESULTS_ANSWER,
};
pub use config::{ChunkingConfig, OrchestratorConfig};
pub use embeddings::{Embedder, HashingEmbedder, HttpEmbedder, OnnxEmbedder};
pub use errors::{
    ConfigurationError, EmbeddingError, IndexConsistencyError, IngestionError,
    OrchestratorError, TraceError,
};
pub use router::{Condition, Router, RoutingDecision, RoutingRule};
pub use specialists::{RetrievalOutcome, RetrievalResult, Specialist, SpecialistKind};
pub use synthesis::Synthesizer;
pub use trace::{FileTraceRecorder, Trace, TraceRecorder};
pub use vector::{BuildReport, VectorIndexStore};
