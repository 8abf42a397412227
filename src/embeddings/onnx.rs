// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX sentence-transformer embedder (all-MiniLM-L6-v2)
//!
//! Loads `model.onnx` and `tokenizer.json` from the configured model directory on
//! first use, then embeds with:
//! - BERT tokenization, truncated to 256 tokens
//! - batch padding with a zero attention mask
//! - mean pooling over token embeddings, weighted by the attention mask
//!
//! Inference runs on the blocking pool; the session is shared behind a mutex.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, ArrayView2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{check_dimension, Embedder};
use crate::errors::{ConfigurationError, EmbeddingError};

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Maximum sequence length of all-MiniLM-L6-v2
const MAX_SEQUENCE_LENGTH: usize = 256;

/// Texts per inference call
const INFERENCE_BATCH: usize = 32;

pub struct OnnxEmbedder {
    model_name: String,
    model_dir: PathBuf,
    dimension: usize,
    model: OnceCell<Arc<LoadedModel>>,
}

struct LoadedModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_name", &self.model_name)
            .field("model_dir", &self.model_dir)
            .field("dimension", &self.dimension)
            .field("loaded", &self.model.initialized())
            .finish()
    }
}

impl OnnxEmbedder {
    /// Nothing is read from disk until the first embedding call
    pub fn new(
        model_name: impl Into<String>,
        model_dir: impl Into<PathBuf>,
        dimension: usize,
    ) -> Result<Self, ConfigurationError> {
        if dimension == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "embedding dimension",
            });
        }
        Ok(Self {
            model_name: model_name.into(),
            model_dir: model_dir.into(),
            dimension,
            model: OnceCell::new(),
        })
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_FILE)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(TOKENIZER_FILE)
    }

    fn missing_files(&self) -> Vec<PathBuf> {
        [self.model_path(), self.tokenizer_path()]
            .into_iter()
            .filter(|p| !p.is_file())
            .collect()
    }

    async fn model(&self) -> Result<Arc<LoadedModel>, EmbeddingError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let model_path = self.model_path();
                let tokenizer_path = self.tokenizer_path();
                let dimension = self.dimension;
                info!("Loading embedding model {} from {:?}", self.model_name, self.model_dir);

                let loaded = tokio::task::spawn_blocking(move || {
                    LoadedModel::load(&model_path, &tokenizer_path, dimension)
                })
                .await
                .map_err(|e| EmbeddingError::Model(format!("model load task failed: {}", e)))?
                .map_err(|e| EmbeddingError::Model(format!("{:#}", e)))?;

                info!("Embedding model {} ready ({}D)", self.model_name, dimension);
                Ok::<_, EmbeddingError>(Arc::new(loaded))
            })
            .await?;
        Ok(model.clone())
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let model = self.model().await?;
        let vectors = tokio::task::spawn_blocking(move || model.embed_texts(&texts))
            .await
            .map_err(|e| EmbeddingError::Model(format!("inference task failed: {}", e)))?
            .map_err(|e| EmbeddingError::Model(format!("{:#}", e)))?;

        for vector in &vectors {
            check_dimension(self.dimension, vector)?;
        }
        Ok(vectors)
    }
}

impl LoadedModel {
    fn load(model_path: &Path, tokenizer_path: &Path, dimension: usize) -> Result<Self> {
        if !model_path.is_file() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.is_file() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let model = Self {
            session: Mutex::new(session),
            tokenizer,
            dimension,
        };

        // Reject a model whose hidden size differs from the configured dimension
        let sample = model.embed_texts(&["validation test".to_string()])?;
        if sample.first().map(|v| v.len()) != Some(dimension) {
            anyhow::bail!(
                "Model outputs {:?} dimensions, expected {}",
                sample.first().map(|v| v.len()),
                dimension
            );
        }
        Ok(model)
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(INFERENCE_BATCH) {
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = texts
            .iter()
            .map(|text| {
                self.tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0)
            .max(1);

        let mut input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut attention_mask = Vec::with_capacity(texts.len() * max_len);
        for encoding in &encodings {
            let ids = encoding.get_ids();
            input_ids.extend(ids.iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));

            let padding = max_len - ids.len();
            input_ids.extend(std::iter::repeat(0i64).take(padding));
            attention_mask.extend(std::iter::repeat(0i64).take(padding));
        }
        let token_type_ids = vec![0i64; texts.len() * max_len];

        let shape = (texts.len(), max_len);
        let input_ids_array =
            Array2::from_shape_vec(shape, input_ids).context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec(shape, attention_mask.clone())
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec(shape, token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("embedding session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // [batch, seq_len, hidden]; index 0 because output names differ between exports
        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        let shape = hidden.shape();
        if shape.len() != 3 || shape[0] != texts.len() || shape[2] != self.dimension {
            anyhow::bail!(
                "Model output shape {:?}, expected [{}, seq_len, {}]",
                shape,
                texts.len(),
                self.dimension
            );
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, mask) in attention_mask.chunks(max_len).enumerate() {
            let tokens = hidden
                .index_axis(Axis(0), i)
                .into_dimensionality::<Ix2>()
                .context("Unexpected token embedding rank")?;
            embeddings.push(mean_pool(tokens, mask));
        }

        debug!("Embedded {} texts (padded to {} tokens)", texts.len(), max_len);
        Ok(embeddings)
    }
}

/// Average token embeddings, counting only positions where `mask` is set
pub fn mean_pool(tokens: ArrayView2<f32>, mask: &[i64]) -> Vec<f32> {
    let hidden = tokens.ncols();
    let mut pooled = vec![0.0f32; hidden];
    let mut weight = 0.0f32;

    for (row, &m) in tokens.rows().into_iter().zip(mask) {
        let m = m as f32;
        if m == 0.0 {
            continue;
        }
        weight += m;
        for (acc, value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value * m;
        }
    }

    for value in &mut pooled {
        *value /= weight.max(1e-9);
    }
    pooled
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    fn model_id(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn unavailable_reason(&self) -> Option<String> {
        let missing = self.missing_files();
        if missing.is_empty() {
            return None;
        }
        let names: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        Some(format!("missing model files: {}", names.join(", ")))
    }

    async fn warm_up(&self) -> Result<(), EmbeddingError> {
        self.model().await.map(|_| ())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.run(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding produced".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.to_vec()).await
    }
}
