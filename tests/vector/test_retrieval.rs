// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use nebula_orchestrator::config::{ChunkingConfig, DocumentLimits, ALLOWED_EXTENSIONS};
use nebula_orchestrator::embeddings::HashingEmbedder;
use nebula_orchestrator::vector::VectorIndexStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn store(dir: &TempDir) -> VectorIndexStore {
    VectorIndexStore::new(
        dir.path().join("rag_index"),
        dir.path().join("docs"),
        Arc::new(HashingEmbedder::new(64).unwrap()),
        ChunkingConfig::new(12, 3).unwrap(),
        DocumentLimits {
            max_document_bytes: 1024 * 1024,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

fn write_doc(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    let path = docs.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn corpus(dir: &TempDir) -> Vec<PathBuf> {
    vec![
        write_doc(
            dir,
            "ocean.txt",
            "tides currents salinity plankton coral reefs kelp forests whales dolphins \
             trenches abyssal plains hydrothermal vents upwelling estuaries lagoons",
        ),
        write_doc(
            dir,
            "space.md",
            "nebula quasar pulsar galaxy redshift exoplanet telescope orbit comet asteroid \
             magnetar supernova parallax spectroscopy cosmology inflation",
        ),
        write_doc(
            dir,
            "kitchen.txt",
            "whisk saucepan skillet braise simmer sear knead dough proofing yeast \
             roux emulsion vinaigrette julienne mirepoix stock reduction",
        ),
    ]
}

#[tokio::test]
async fn test_every_chunk_retrieves_itself_first() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let report = store.build(&corpus(&dir), "idx").await.unwrap();
    assert!(!report.is_partial());
    assert_eq!(report.documents, vec!["ocean.txt", "space.md", "kitchen.txt"]);

    let index = store.ensure_loaded("idx").await.unwrap();
    assert_eq!(index.len(), report.chunk_count);

    for record in &index.chunks {
        let hits = store.query("idx", &record.chunk.text, 3).await.unwrap();
        assert_eq!(hits[0].chunk, record.chunk);
        assert!(hits[0].distance.abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_hits_ascend_by_distance_and_respect_k() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let report = store.build(&corpus(&dir), "idx").await.unwrap();

    let hits = store.query("idx", "galaxy telescope supernova", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.source, "space.md");
    assert!(hits[0].distance <= hits[1].distance);

    let all = store.query("idx", "galaxy", 1000).await.unwrap();
    assert_eq!(all.len(), report.chunk_count);
    assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));

    assert!(store.query("idx", "galaxy", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rebuild_from_same_documents_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let docs = corpus(&dir);

    let first = store.build(&docs, "idx").await.unwrap();
    let before = store.query("idx", "simmer the stock", 4).await.unwrap();
    let second = store.build(&docs, "idx").await.unwrap();
    let after = store.query("idx", "simmer the stock", 4).await.unwrap();

    assert_ne!(first.generation, second.generation);
    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.chunk, b.chunk);
        assert_eq!(a.distance, b.distance);
    }
}

#[tokio::test]
async fn test_equal_distances_keep_insertion_order() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let b = write_doc(&dir, "b.txt", "identical words in both files");
    let a = write_doc(&dir, "a.txt", "identical words in both files");

    store.build(&[b, a], "idx").await.unwrap();
    let hits = store.query("idx", "identical words", 2).await.unwrap();

    assert_eq!(hits[0].distance, hits[1].distance);
    assert_eq!(hits[0].chunk.source, "b.txt");
    assert_eq!(hits[1].chunk.source, "a.txt");
}

#[tokio::test]
async fn test_partial_failures_are_reported() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let good = write_doc(&dir, "good.txt", "usable content for the index");
    let bad_type = write_doc(&dir, "slides.pptx", "ignored");
    let blank = write_doc(&dir, "blank.md", "   ");

    let report = store.build(&[good, bad_type, blank], "idx").await.unwrap();

    assert!(report.is_partial());
    assert_eq!(report.documents, vec!["good.txt"]);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures[0].path.ends_with("slides.pptx"));
    assert!(store.status("idx").await.unwrap().ready);
}

#[tokio::test]
async fn test_query_builds_missing_index_from_default_documents() {
    let dir = TempDir::new().unwrap();
    corpus(&dir);
    let store = store(&dir);
    assert!(!store.status("nebula_rag").await.unwrap().ready);

    let hits = store.query("nebula_rag", "coral reefs", 1).await.unwrap();
    assert_eq!(hits[0].chunk.source, "ocean.txt");

    let status = store.status("nebula_rag").await.unwrap();
    assert!(status.ready);
    assert_eq!(status.embedder.as_deref(), Some("hashing-64"));
    assert_eq!(status.dimension, Some(64));
}

#[tokio::test]
async fn test_artifacts_survive_a_new_store() {
    let dir = TempDir::new().unwrap();
    let report = store(&dir).build(&corpus(&dir), "idx").await.unwrap();

    let reopened = store(&dir);
    let index = reopened.load("idx").await.unwrap().expect("index on disk");
    assert_eq!(index.manifest.generation, report.generation);
    assert_eq!(index.vectors.len(), index.chunks.len());
    assert_eq!(index.manifest.chunk_count, report.chunk_count);
}
