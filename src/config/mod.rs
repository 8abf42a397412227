// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Orchestrator configuration
//!
//! Everything the core consumes (paths, chunk window, embedder identity, top-k per
//! specialist, per-call timeouts, provider credentials) is loaded here once and
//! injected into components at construction.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigurationError;
use crate::search::config::{LiteratureConfig, SearchConfig};

pub const DEFAULT_INDEX_NAME: &str = "nebula_rag";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Holds `model.onnx` and `tokenizer.json`, relative to the data directory
pub const DEFAULT_EMBEDDING_MODEL_DIR: &str = "models/all-MiniLM-L6-v2-onnx";
pub const DEFAULT_LLM_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.1-8b-instant";

/// Document types admitted for ingestion
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub paths: PathsConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalConfig,
    pub timeouts: TimeoutConfig,
    pub limits: DocumentLimits,
    pub search: SearchConfig,
    pub literature: LiteratureConfig,
    pub synthesis: SynthesisConfig,
}

/// On-disk locations
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Directory holding the documents the default index is built from
    pub documents_dir: PathBuf,
    /// Directory holding named indexes
    pub index_dir: PathBuf,
    /// Append-only directory of trace records
    pub trace_dir: PathBuf,
    /// Name of the index the document specialist queries
    pub index_name: String,
}

/// Word-window chunking parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub window_words: usize,
    pub overlap_words: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    /// all-MiniLM-L6-v2 run locally through ONNX Runtime
    Onnx,
    /// Deterministic feature-hashing embedder for tests and offline runs
    Hashing,
    /// OpenAI-compatible `/v1/embeddings` endpoint
    Http,
}

impl FromStr for EmbeddingProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onnx" | "local" | "minilm" => Ok(EmbeddingProviderKind::Onnx),
            "hashing" | "hash" => Ok(EmbeddingProviderKind::Hashing),
            "http" | "openai" | "remote" => Ok(EmbeddingProviderKind::Http),
            other => Err(ConfigurationError::Invalid {
                field: "EMBEDDING_PROVIDER".to_string(),
                reason: format!("unknown provider '{}'", other),
            }),
        }
    }
}

/// Embedding function identity; fixed for the lifetime of an index
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    /// Local model files, used by the ONNX provider
    pub model_dir: PathBuf,
    pub dimension: usize,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

/// Evidence limits per specialist
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    pub document_top_k: usize,
    pub web_top_k: usize,
    pub literature_top_k: usize,
    /// Evidence items folded into each synthesis context block
    pub context_items: usize,
}

/// Independent bounds on each external call
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    pub embedding_ms: u64,
    pub search_ms: u64,
    pub synthesis_ms: u64,
    pub specialist_ms: u64,
}

impl TimeoutConfig {
    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }

    pub fn search(&self) -> Duration {
        Duration::from_millis(self.search_ms)
    }

    pub fn synthesis(&self) -> Duration {
        Duration::from_millis(self.synthesis_ms)
    }

    pub fn specialist(&self) -> Duration {
        Duration::from_millis(self.specialist_ms)
    }
}

/// Admission limits applied before text reaches the chunker
#[derive(Debug, Clone)]
pub struct DocumentLimits {
    pub max_document_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

/// Text-generation collaborator settings
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Display name, e.g. "GROQ"
    pub provider: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl OrchestratorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let data_dir = PathBuf::from(env::var("NEBULA_DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

        let provider = match env_opt("EMBEDDING_PROVIDER") {
            Some(v) => v.parse()?,
            None => EmbeddingProviderKind::Onnx,
        };

        let config = Self {
            paths: PathsConfig {
                documents_dir: env_opt("DOCUMENTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join("sample_pdfs")),
                index_dir: env_opt("RAG_INDEX_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join("rag_index")),
                trace_dir: env_opt("TRACE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join("logs")),
                index_name: env::var("RAG_INDEX_NAME")
                    .unwrap_or_else(|_| DEFAULT_INDEX_NAME.to_string()),
            },
            chunking: ChunkingConfig {
                window_words: env_or("CHUNK_WINDOW_WORDS", 500),
                overlap_words: env_or("CHUNK_OVERLAP_WORDS", 50),
            },
            embedding: EmbeddingSettings {
                provider,
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
                model_dir: env_opt("EMBEDDING_MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| data_dir.join(DEFAULT_EMBEDDING_MODEL_DIR)),
                dimension: env_or("EMBEDDING_DIMENSION", 384),
                api_url: env_opt("EMBEDDING_API_URL"),
                api_key: env_opt("EMBEDDING_API_KEY"),
            },
            retrieval: RetrievalConfig {
                document_top_k: env_or("DOCUMENT_TOP_K", 5),
                web_top_k: env_or("WEB_TOP_K", 5),
                literature_top_k: env_or("LITERATURE_TOP_K", 5),
                context_items: 3,
            },
            timeouts: TimeoutConfig {
                embedding_ms: env_or("EMBEDDING_TIMEOUT_MS", 10_000),
                search_ms: env_or("SEARCH_TIMEOUT_MS", 20_000),
                synthesis_ms: env_or("SYNTHESIS_TIMEOUT_MS", 30_000),
                specialist_ms: env_or("SPECIALIST_TIMEOUT_MS", 45_000),
            },
            limits: DocumentLimits {
                max_document_bytes: env_or::<u64>("MAX_DOCUMENT_SIZE_MB", 10) * 1024 * 1024,
                allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            },
            search: SearchConfig::from_env(),
            literature: LiteratureConfig::from_env(),
            synthesis: SynthesisConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "GROQ".to_string()),
                api_url: env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string()),
                api_key: env_opt("GROQ_API_KEY"),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
                max_tokens: env_or("LLM_MAX_TOKENS", 800),
                temperature: env_or("LLM_TEMPERATURE", 0.7),
                top_p: 0.9,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Rooted defaults, used by tests and embedders of the library
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            paths: PathsConfig {
                documents_dir: data_dir.join("sample_pdfs"),
                index_dir: data_dir.join("rag_index"),
                trace_dir: data_dir.join("logs"),
                index_name: DEFAULT_INDEX_NAME.to_string(),
            },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingSettings {
                provider: EmbeddingProviderKind::Onnx,
                model: DEFAULT_EMBEDDING_MODEL.to_string(),
                model_dir: data_dir.join(DEFAULT_EMBEDDING_MODEL_DIR),
                dimension: 384,
                api_url: None,
                api_key: None,
            },
            retrieval: RetrievalConfig {
                document_top_k: 5,
                web_top_k: 5,
                literature_top_k: 5,
                context_items: 3,
            },
            timeouts: TimeoutConfig {
                embedding_ms: 10_000,
                search_ms: 20_000,
                synthesis_ms: 30_000,
                specialist_ms: 45_000,
            },
            limits: DocumentLimits {
                max_document_bytes: 10 * 1024 * 1024,
                allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            },
            search: SearchConfig::default(),
            literature: LiteratureConfig::default(),
            synthesis: SynthesisConfig {
                provider: "GROQ".to_string(),
                api_url: DEFAULT_LLM_API_URL.to_string(),
                api_key: None,
                model: DEFAULT_LLM_MODEL.to_string(),
                max_tokens: 800,
                temperature: 0.7,
                top_p: 0.9,
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.chunking.validate()?;

        if self.paths.index_name.trim().is_empty() {
            return Err(ConfigurationError::Missing("RAG_INDEX_NAME".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "embedding dimension",
            });
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigurationError::Missing("EMBEDDING_MODEL".to_string()));
        }
        if self.embedding.provider == EmbeddingProviderKind::Http && self.embedding.api_url.is_none() {
            return Err(ConfigurationError::Missing("EMBEDDING_API_URL".to_string()));
        }

        for (field, value) in [
            ("document top_k", self.retrieval.document_top_k),
            ("web top_k", self.retrieval.web_top_k),
            ("literature top_k", self.retrieval.literature_top_k),
        ] {
            if value == 0 {
                return Err(ConfigurationError::ZeroValue { field });
            }
        }

        for (field, value) in [
            ("embedding timeout", self.timeouts.embedding_ms),
            ("search timeout", self.timeouts.search_ms),
            ("synthesis timeout", self.timeouts.synthesis_ms),
            ("specialist timeout", self.timeouts.specialist_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::ZeroValue { field });
            }
        }

        if self.limits.max_document_bytes == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "max document size",
            });
        }

        self.search
            .validate()
            .map_err(|reason| ConfigurationError::Invalid {
                field: "search".to_string(),
                reason,
            })?;

        Ok(())
    }
}

impl ChunkingConfig {
    pub fn new(window_words: usize, overlap_words: usize) -> Result<Self, ConfigurationError> {
        let config = Self {
            window_words,
            overlap_words,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.window_words == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "chunk window",
            });
        }
        if self.overlap_words >= self.window_words {
            return Err(ConfigurationError::OverlapNotSmallerThanWindow {
                window: self.window_words,
                overlap: self.overlap_words,
            });
        }
        Ok(())
    }

    /// Words the window advances by
    pub fn stride(&self) -> usize {
        self.window_words - self.overlap_words
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_words: 500,
            overlap_words: 50,
        }
    }
}
