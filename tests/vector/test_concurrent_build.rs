// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use nebula_orchestrator::config::{ChunkingConfig, DocumentLimits, ALLOWED_EXTENSIONS};
use nebula_orchestrator::embeddings::{Embedder, HashingEmbedder};
use nebula_orchestrator::errors::EmbeddingError;
use nebula_orchestrator::vector::VectorIndexStore;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Counts batch calls, i.e. index builds for a one-batch corpus
struct CountingEmbedder {
    inner: HashingEmbedder,
    batches: AtomicUsize,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        // widen the window in which a second build could start
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.inner.embed_batch(texts).await
    }
}

fn setup(dir: &TempDir) -> (Arc<VectorIndexStore>, Arc<CountingEmbedder>) {
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("a.txt"), "shared first query content about lighthouses").unwrap();
    fs::write(docs.join("b.md"), "second document describing harbours and piers").unwrap();

    let embedder = Arc::new(CountingEmbedder {
        inner: HashingEmbedder::new(32).unwrap(),
        batches: AtomicUsize::new(0),
    });
    let store = VectorIndexStore::new(
        dir.path().join("rag_index"),
        docs,
        embedder.clone(),
        ChunkingConfig::new(50, 5).unwrap(),
        DocumentLimits {
            max_document_bytes: 1024 * 1024,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        },
        Duration::from_secs(5),
    )
    .unwrap();
    (Arc::new(store), embedder)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_queries_build_once() {
    let dir = TempDir::new().unwrap();
    let (store, embedder) = setup(&dir);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.query("nebula_rag", "lighthouses", 2).await })
        })
        .collect();

    let mut generations = Vec::new();
    for handle in handles {
        let hits = handle.await.unwrap().unwrap();
        assert_eq!(hits.len(), 2);
        generations.push(store.status("nebula_rag").await.unwrap().generation);
    }

    assert_eq!(embedder.batches.load(Ordering::SeqCst), 1);
    assert!(generations.windows(2).all(|w| w[0] == w[1]));

    let index_root = dir.path().join("rag_index/nebula_rag");
    let generation_dirs: Vec<_> = fs::read_dir(&index_root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    assert_eq!(generation_dirs.len(), 1);

    // The surviving generation pairs every vector with exactly one chunk record
    let gen_dir = &generation_dirs[0];
    let vectors: Vec<Vec<f32>> =
        bincode::deserialize(&fs::read(gen_dir.join("vectors.bin")).unwrap()).unwrap();
    let chunks: Vec<serde_json::Value> =
        serde_json::from_slice(&fs::read(gen_dir.join("chunks.json")).unwrap()).unwrap();
    assert!(!vectors.is_empty());
    assert_eq!(vectors.len(), chunks.len());
    assert_eq!(
        store.status("nebula_rag").await.unwrap().chunk_count,
        vectors.len()
    );
}

#[tokio::test]
async fn test_loaded_index_is_reused() {
    let dir = TempDir::new().unwrap();
    let (store, embedder) = setup(&dir);

    store.query("nebula_rag", "harbours", 1).await.unwrap();
    store.query("nebula_rag", "piers", 1).await.unwrap();
    store.query("nebula_rag", "lighthouses", 1).await.unwrap();

    assert_eq!(embedder.batches.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_names_build_independently() {
    let dir = TempDir::new().unwrap();
    let (store, embedder) = setup(&dir);

    let (a, b) = tokio::join!(
        store.query("first", "lighthouses", 1),
        store.query("second", "lighthouses", 1)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(embedder.batches.load(Ordering::SeqCst), 2);
}
