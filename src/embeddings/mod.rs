// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding functions
//!
//! The vector index store never owns a global model: an `Embedder` is injected at
//! construction, and its `model_id()`/`dimension()` pair is recorded in every index
//! manifest so a mismatched embedder is detected instead of silently mixing spaces.
//!
//! - `OnnxEmbedder`: all-MiniLM-L6-v2 on ONNX Runtime, the default
//! - `HttpEmbedder`: OpenAI-compatible `/v1/embeddings` endpoint
//! - `HashingEmbedder`: deterministic feature hashing for tests and offline runs

pub mod hashing;
pub mod http;
pub mod onnx;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingProviderKind, EmbeddingSettings};
use crate::errors::{ConfigurationError, EmbeddingError};

pub use hashing::HashingEmbedder;
pub use http::HttpEmbedder;
pub use onnx::OnnxEmbedder;

/// Maps text to fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identity of the embedding function
    fn model_id(&self) -> &str;

    /// Output dimensionality; every vector has exactly this length
    fn dimension(&self) -> usize;

    /// Why the embedder cannot serve requests, checked without loading anything
    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    /// Prepare expensive state (model sessions) ahead of the first timed call
    async fn warm_up(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts, preserving order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Build the configured embedder
pub fn build_embedder(
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> Result<Arc<dyn Embedder>, ConfigurationError> {
    match settings.provider {
        EmbeddingProviderKind::Onnx => Ok(Arc::new(OnnxEmbedder::new(
            settings.model.clone(),
            settings.model_dir.clone(),
            settings.dimension,
        )?)),
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(settings.dimension)?)),
        EmbeddingProviderKind::Http => {
            let url = settings
                .api_url
                .clone()
                .ok_or_else(|| ConfigurationError::Missing("EMBEDDING_API_URL".to_string()))?;
            Ok(Arc::new(HttpEmbedder::new(
                url,
                settings.api_key.clone(),
                settings.model.clone(),
                settings.dimension,
                timeout,
            )?))
        }
    }
}

/// Check a produced vector against the embedder's declared dimension
pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::InvalidResponse(
            "vector contains NaN or Infinity".to_string(),
        ));
    }
    Ok(())
}
