// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible `/v1/embeddings` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{check_dimension, Embedder};
use crate::errors::{ConfigurationError, EmbeddingError};

/// Inputs longer than this are truncated before sending
const MAX_INPUT_CHARS: usize = 12_000;

pub struct HttpEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl HttpEmbedder {
    pub fn new(
        url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        if dimension == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "embedding dimension",
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                field: "EMBEDDING_API_URL".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            url,
            api_key,
            model,
            dimension,
            timeout,
        })
    }

    async fn request(&self, inputs: Vec<&str>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = inputs.len();
        let body = EmbeddingsRequest {
            model: &self.model,
            input: inputs,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else {
                EmbeddingError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Request(format!(
                "status={}; body={}",
                status.as_u16(),
                truncate(&message, 200)
            )));
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                expected,
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        for v in &vectors {
            check_dimension(self.dimension, v)?;
        }

        debug!("Embedded {} inputs with {}", vectors.len(), self.model);
        Ok(vectors)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.request(vec![truncate(text, MAX_INPUT_CHARS)]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embeddings response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs = texts.iter().map(|t| truncate(t, MAX_INPUT_CHARS)).collect();
        self.request(inputs).await
    }
}
