// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Named vector indexes on disk
//!
//! Layout per index name:
//!
//! ```text
//! {index_dir}/{name}/CURRENT              -> generation id
//! {index_dir}/{name}/{gen}/vectors.bin    -> bincode Vec<Vec<f32>>
//! {index_dir}/{name}/{gen}/chunks.json    -> Vec<ChunkRecord>, same order as vectors
//! {index_dir}/{name}/{gen}/manifest.json  -> IndexManifest
//! ```
//!
//! A build writes a fresh generation directory and only then swaps `CURRENT`, so a
//! reader either sees the previous complete generation or the new one. Builds for the
//! same name are serialized by a per-name lock; build-on-miss re-checks under that lock.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::fs;
use tracing::{debug, info, warn};

use super::distance::nearest;
use super::types::{
    BuildReport, ChunkRecord, IndexHit, IndexManifest, IndexStatus, IndexedDocument,
    IngestionFailure,
};
use crate::config::{ChunkingConfig, DocumentLimits, OrchestratorConfig};
use crate::embeddings::Embedder;
use crate::errors::{
    ConfigurationError, EmbeddingError, IndexConsistencyError, IngestionError, OrchestratorError,
};
use crate::rag::{chunk_document, extract_document, list_documents, ExtractedDocument};
use crate::utils::write_atomic;

const CURRENT_FILE: &str = "CURRENT";
const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Chunks embedded per embedder call during a build
const EMBED_BATCH_SIZE: usize = 32;

/// A fully validated generation held in memory
#[derive(Debug)]
pub struct LoadedIndex {
    pub manifest: IndexManifest,
    pub vectors: Vec<Vec<f32>>,
    pub chunks: Vec<ChunkRecord>,
}

impl LoadedIndex {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

pub struct VectorIndexStore {
    index_dir: PathBuf,
    default_documents_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    limits: DocumentLimits,
    embed_timeout: Duration,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    loaded: RwLock<HashMap<String, Arc<LoadedIndex>>>,
}

impl VectorIndexStore {
    pub fn new(
        index_dir: impl Into<PathBuf>,
        default_documents_dir: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
        limits: DocumentLimits,
        embed_timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        chunking.validate()?;
        if embedder.dimension() == 0 {
            return Err(ConfigurationError::ZeroValue {
                field: "embedding dimension",
            });
        }

        Ok(Self {
            index_dir: index_dir.into(),
            default_documents_dir: default_documents_dir.into(),
            embedder,
            chunking,
            limits,
            embed_timeout,
            locks: Mutex::new(HashMap::new()),
            loaded: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(
        config: &OrchestratorConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, ConfigurationError> {
        Self::new(
            config.paths.index_dir.clone(),
            config.paths.documents_dir.clone(),
            embedder,
            config.chunking,
            config.limits.clone(),
            config.timeouts.embedding(),
        )
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn default_documents_dir(&self) -> &Path {
        &self.default_documents_dir
    }

    /// Directory holding every generation of `index_name`
    pub fn index_root(&self, index_name: &str) -> Result<PathBuf, ConfigurationError> {
        let valid = !index_name.trim().is_empty()
            && !index_name.starts_with('.')
            && index_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(ConfigurationError::Invalid {
                field: "index name".to_string(),
                reason: format!("'{}' is not a valid index name", index_name),
            });
        }
        Ok(self.index_dir.join(index_name))
    }

    fn lock_for(&self, index_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks
            .entry(index_name.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn cached(&self, index_name: &str, generation: &str) -> Option<Arc<LoadedIndex>> {
        let loaded = self.loaded.read().unwrap_or_else(|p| p.into_inner());
        loaded
            .get(index_name)
            .filter(|idx| idx.manifest.generation == generation)
            .cloned()
    }

    fn remember(&self, index_name: &str, index: Arc<LoadedIndex>) {
        let mut loaded = self.loaded.write().unwrap_or_else(|p| p.into_inner());
        loaded.insert(index_name.to_string(), index);
    }

    fn forget(&self, index_name: &str) {
        let mut loaded = self.loaded.write().unwrap_or_else(|p| p.into_inner());
        loaded.remove(index_name);
    }

    /// Build `index_name` from `document_paths`, replacing any previous generation
    ///
    /// Documents that fail admission or extraction are skipped and listed in
    /// `BuildReport::failures`. Fails with `IngestionError::NothingIngested` when
    /// documents were given but none could be ingested.
    pub async fn build(
        &self,
        document_paths: &[PathBuf],
        index_name: &str,
    ) -> Result<BuildReport, OrchestratorError> {
        self.index_root(index_name)?;
        let lock = self.lock_for(index_name);
        let _guard = lock.lock().await;
        let (report, _) = self.build_locked(document_paths, index_name).await?;
        Ok(report)
    }

    async fn build_locked(
        &self,
        document_paths: &[PathBuf],
        index_name: &str,
    ) -> Result<(BuildReport, Arc<LoadedIndex>), OrchestratorError> {
        let root = self.index_root(index_name)?;
        info!(
            "Building index '{}' from {} documents",
            index_name,
            document_paths.len()
        );

        let mut failures = Vec::new();
        let mut documents = Vec::new();
        let mut records: Vec<ChunkRecord> = Vec::new();

        for path in document_paths {
            match self.extract(path).await {
                Ok(doc) => {
                    let chunks = chunk_document(&doc.source, &doc.text, &self.chunking)?;
                    debug!("{} -> {} chunks", doc.source, chunks.len());
                    documents.push(IndexedDocument {
                        source: doc.source.clone(),
                        sha256: doc.content_sha256.clone(),
                        chunk_count: chunks.len(),
                    });
                    records.extend(chunks.into_iter().map(|chunk| ChunkRecord {
                        chunk,
                        document_sha256: doc.content_sha256.clone(),
                    }));
                }
                Err(e) => {
                    warn!("Skipping document {:?}: {}", path, e);
                    failures.push(IngestionFailure {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if documents.is_empty() && !failures.is_empty() {
            return Err(IngestionError::NothingIngested {
                index_name: index_name.to_string(),
                failed: failures.len(),
            }
            .into());
        }

        let vectors = self.embed_records(index_name, &records).await?;

        let generation = uuid::Uuid::new_v4().simple().to_string();
        let manifest = IndexManifest {
            index_name: index_name.to_string(),
            generation: generation.clone(),
            embedder: self.embedder.model_id().to_string(),
            dimension: self.embedder.dimension(),
            chunk_count: records.len(),
            documents,
            built_at: Utc::now(),
        };

        let gen_dir = root.join(&generation);
        fs::create_dir_all(&gen_dir).await?;
        fs::write(gen_dir.join(VECTORS_FILE), bincode::serialize(&vectors)?).await?;
        fs::write(gen_dir.join(CHUNKS_FILE), serde_json::to_vec(&records)?).await?;
        fs::write(
            gen_dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;

        let previous = read_current(&root).await?;
        write_atomic(&root.join(CURRENT_FILE), generation.as_bytes()).await?;
        prune_generations(&root, &generation, previous.as_deref()).await;

        let report = BuildReport {
            index_name: index_name.to_string(),
            generation: generation.clone(),
            chunk_count: records.len(),
            dimension: manifest.dimension,
            documents: manifest.documents.iter().map(|d| d.source.clone()).collect(),
            failures,
        };

        info!(
            "Index '{}' generation {} ready: {} chunks from {} documents ({} failed)",
            index_name,
            generation,
            report.chunk_count,
            report.documents.len(),
            report.failures.len()
        );

        let index = Arc::new(LoadedIndex {
            manifest,
            vectors,
            chunks: records,
        });
        self.remember(index_name, index.clone());
        Ok((report, index))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedDocument, IngestionError> {
        let path_buf = path.to_path_buf();
        let limits = self.limits.clone();
        match tokio::task::spawn_blocking(move || extract_document(&path_buf, &limits)).await {
            Ok(result) => result,
            Err(e) => Err(IngestionError::Unparsable {
                path: path.to_path_buf(),
                reason: format!("extraction task failed: {}", e),
            }),
        }
    }

    async fn embed_records(
        &self,
        index_name: &str,
        records: &[ChunkRecord],
    ) -> Result<Vec<Vec<f32>>, OrchestratorError> {
        let expected = self.embedder.dimension();
        let mut vectors = Vec::with_capacity(records.len());

        for batch in records.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|r| r.chunk.text.clone()).collect();
            let embedded = self.with_timeout(self.embedder.embed_batch(&texts)).await?;
            if embedded.len() != texts.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embedded.len()
                ))
                .into());
            }
            for vector in embedded {
                if vector.len() != expected {
                    return Err(IndexConsistencyError::DimensionMismatch {
                        index_name: index_name.to_string(),
                        expected,
                        actual: vector.len(),
                    }
                    .into());
                }
                vectors.push(vector);
            }
        }

        Ok(vectors)
    }

    async fn with_timeout<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, EmbeddingError>>,
    ) -> Result<T, EmbeddingError> {
        // Model loading is not an embedding call; keep it outside the timeout
        self.embedder.warm_up().await?;
        match tokio::time::timeout(self.embed_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout {
                timeout_ms: self.embed_timeout.as_millis() as u64,
            }),
        }
    }

    /// Load and validate the current generation of `index_name`
    ///
    /// # Returns
    /// * `Ok(None)` - the index has never been built, or was invalidated
    /// * `Ok(Some(index))` - artifacts agree with each other and with the embedder
    /// * `Err(IndexConsistency)` - artifacts exist but cannot be served
    pub async fn load(&self, index_name: &str) -> Result<Option<Arc<LoadedIndex>>, OrchestratorError> {
        let root = self.index_root(index_name)?;
        let generation = match read_current(&root).await? {
            Some(g) => g,
            None => return Ok(None),
        };

        if let Some(index) = self.cached(index_name, &generation) {
            return Ok(Some(index));
        }

        let gen_dir = root.join(&generation);
        let corrupt = |reason: String| IndexConsistencyError::Corrupt {
            index_name: index_name.to_string(),
            reason,
        };

        let manifest: IndexManifest = serde_json::from_slice(
            &read_artifact(&gen_dir, MANIFEST_FILE)
                .await
                .map_err(|e| corrupt(e.to_string()))?,
        )
        .map_err(|e| corrupt(format!("{}: {}", MANIFEST_FILE, e)))?;

        let vectors: Vec<Vec<f32>> = bincode::deserialize(
            &read_artifact(&gen_dir, VECTORS_FILE)
                .await
                .map_err(|e| corrupt(e.to_string()))?,
        )
        .map_err(|e| corrupt(format!("{}: {}", VECTORS_FILE, e)))?;

        let chunks: Vec<ChunkRecord> = serde_json::from_slice(
            &read_artifact(&gen_dir, CHUNKS_FILE)
                .await
                .map_err(|e| corrupt(e.to_string()))?,
        )
        .map_err(|e| corrupt(format!("{}: {}", CHUNKS_FILE, e)))?;

        let index = LoadedIndex {
            manifest,
            vectors,
            chunks,
        };
        self.validate(index_name, &index)?;

        debug!(
            "Loaded index '{}' generation {} ({} chunks)",
            index_name,
            generation,
            index.len()
        );
        let index = Arc::new(index);
        self.remember(index_name, index.clone());
        Ok(Some(index))
    }

    fn validate(&self, index_name: &str, index: &LoadedIndex) -> Result<(), IndexConsistencyError> {
        let manifest = &index.manifest;

        if manifest.embedder != self.embedder.model_id() {
            return Err(IndexConsistencyError::EmbedderMismatch {
                index_name: index_name.to_string(),
                built_with: manifest.embedder.clone(),
                current: self.embedder.model_id().to_string(),
            });
        }
        if manifest.dimension != self.embedder.dimension() {
            return Err(IndexConsistencyError::DimensionMismatch {
                index_name: index_name.to_string(),
                expected: self.embedder.dimension(),
                actual: manifest.dimension,
            });
        }
        if index.vectors.len() != index.chunks.len() || index.chunks.len() != manifest.chunk_count {
            return Err(IndexConsistencyError::LengthMismatch {
                index_name: index_name.to_string(),
                vectors: index.vectors.len(),
                chunks: index.chunks.len(),
            });
        }
        if let Some(bad) = index.vectors.iter().find(|v| v.len() != manifest.dimension) {
            return Err(IndexConsistencyError::DimensionMismatch {
                index_name: index_name.to_string(),
                expected: manifest.dimension,
                actual: bad.len(),
            });
        }
        Ok(())
    }

    /// Return the loaded index, building it from the default documents on a miss
    ///
    /// An inconsistent index is treated as a miss and rebuilt. Concurrent callers
    /// for the same name wait on one build instead of starting their own.
    pub async fn ensure_loaded(&self, index_name: &str) -> Result<Arc<LoadedIndex>, OrchestratorError> {
        if let Some(index) = self.load_or_flag(index_name).await? {
            return Ok(index);
        }

        let lock = self.lock_for(index_name);
        let _guard = lock.lock().await;

        if let Some(index) = self.load_or_flag(index_name).await? {
            return Ok(index);
        }

        let paths = list_documents(&self.default_documents_dir, &self.limits)?;
        info!(
            "Index '{}' missing, building from {:?} ({} documents)",
            index_name,
            self.default_documents_dir,
            paths.len()
        );
        let (_, index) = self.build_locked(&paths, index_name).await?;
        Ok(index)
    }

    async fn load_or_flag(&self, index_name: &str) -> Result<Option<Arc<LoadedIndex>>, OrchestratorError> {
        match self.load(index_name).await {
            Ok(found) => Ok(found),
            Err(OrchestratorError::IndexConsistency(e)) => {
                warn!("Index '{}' unusable, forcing rebuild: {}", index_name, e);
                self.forget(index_name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The `k` chunks nearest to `query_text`, ascending by Euclidean distance
    pub async fn query(
        &self,
        index_name: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<IndexHit>, OrchestratorError> {
        let index = self.ensure_loaded(index_name).await?;
        if k == 0 || index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.with_timeout(self.embedder.embed(query_text)).await?;
        if query_vector.len() != index.manifest.dimension {
            return Err(IndexConsistencyError::DimensionMismatch {
                index_name: index_name.to_string(),
                expected: index.manifest.dimension,
                actual: query_vector.len(),
            }
            .into());
        }

        let hits = nearest(&query_vector, &index.vectors, k)
            .into_iter()
            .map(|(position, distance)| IndexHit {
                chunk: index.chunks[position].chunk.clone(),
                distance,
            })
            .collect::<Vec<_>>();

        debug!(
            "Query against '{}' returned {} of {} chunks",
            index_name,
            hits.len(),
            index.len()
        );
        Ok(hits)
    }

    pub async fn status(&self, index_name: &str) -> Result<IndexStatus, OrchestratorError> {
        let not_ready = IndexStatus {
            index_name: index_name.to_string(),
            ready: false,
            generation: None,
            embedder: None,
            dimension: None,
            chunk_count: 0,
            built_at: None,
        };

        match self.load(index_name).await {
            Ok(Some(index)) => Ok(IndexStatus {
                index_name: index_name.to_string(),
                ready: true,
                generation: Some(index.manifest.generation.clone()),
                embedder: Some(index.manifest.embedder.clone()),
                dimension: Some(index.manifest.dimension),
                chunk_count: index.len(),
                built_at: Some(index.manifest.built_at),
            }),
            Ok(None) => Ok(not_ready),
            Err(OrchestratorError::IndexConsistency(e)) => {
                warn!("Index '{}' is not servable: {}", index_name, e);
                Ok(not_ready)
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the current generation pointer so the next query rebuilds
    ///
    /// Returns whether an index was current.
    pub async fn invalidate(&self, index_name: &str) -> Result<bool, OrchestratorError> {
        let root = self.index_root(index_name)?;
        let lock = self.lock_for(index_name);
        let _guard = lock.lock().await;

        self.forget(index_name);
        match fs::remove_file(root.join(CURRENT_FILE)).await {
            Ok(()) => {
                info!("Invalidated index '{}'", index_name);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn read_current(root: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(root.join(CURRENT_FILE)).await {
        Ok(content) => {
            let generation = content.trim().to_string();
            Ok((!generation.is_empty()).then_some(generation))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

async fn read_artifact(gen_dir: &Path, name: &str) -> io::Result<Vec<u8>> {
    fs::read(gen_dir.join(name))
        .await
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", name, e)))
}

/// Remove every generation except `current` and `previous`
async fn prune_generations(root: &Path, current: &str, previous: Option<&str>) {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not scan {:?} for old generations: {}", root, e);
            return;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || name == current || Some(name.as_str()) == previous {
            continue;
        }
        if let Err(e) = fs::remove_dir_all(entry.path()).await {
            warn!("Failed to prune generation {}: {}", name, e);
        } else {
            debug!("Pruned generation {}", name);
        }
    }
}
