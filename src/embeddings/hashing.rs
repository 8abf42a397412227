// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Feature-hashing embedder
//!
//! Each lower-cased alphanumeric token is hashed (SHA-256, so buckets are stable
//! across builds and platforms) to a bucket and a sign; the signed term-frequency
//! vector is L2-normalized. The same text always produces the same vector.
//!
//! Only texts sharing literal tokens land near each other, so this is a stand-in
//! for tests and offline runs (`EMBEDDING_PROVIDER=hashing`), not for retrieval.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::errors::{ConfigurationError, EmbeddingError};

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, ConfigurationError> {
        if dimension == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "embedding dimension",
            });
        }
        Ok(Self {
            dimension,
            model_id: format!("hashing-{}", dimension),
        })
    }

    /// Synchronous core, shared by `embed` and `embed_batch`
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}
