// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use nebula_orchestrator::config::{ChunkingConfig, DocumentLimits, ALLOWED_EXTENSIONS};
use nebula_orchestrator::embeddings::HashingEmbedder;
use nebula_orchestrator::errors::{IndexConsistencyError, OrchestratorError};
use nebula_orchestrator::vector::VectorIndexStore;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const INDEX: &str = "nebula_rag";

fn store(dir: &TempDir) -> VectorIndexStore {
    VectorIndexStore::new(
        dir.path().join("rag_index"),
        dir.path().join("docs"),
        Arc::new(HashingEmbedder::new(32).unwrap()),
        ChunkingConfig::new(6, 2).unwrap(),
        DocumentLimits {
            max_document_bytes: 1024 * 1024,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

/// Build the default index and return its current generation directory
async fn built(dir: &TempDir) -> PathBuf {
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("field_notes.txt"),
        "heron egret kingfisher osprey sandpiper plover curlew godwit dunlin knot",
    )
    .unwrap();

    let store = store(dir);
    store.ensure_loaded(INDEX).await.unwrap();

    let root = dir.path().join("rag_index").join(INDEX);
    let generation = fs::read_to_string(root.join("CURRENT")).unwrap();
    root.join(generation.trim())
}

fn current_generation(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("rag_index").join(INDEX).join("CURRENT"))
        .unwrap()
        .trim()
        .to_string()
}

#[tokio::test]
async fn test_vector_count_mismatch_is_detected() {
    let dir = TempDir::new().unwrap();
    let gen_dir = built(&dir).await;

    let mut vectors: Vec<Vec<f32>> =
        bincode::deserialize(&fs::read(gen_dir.join("vectors.bin")).unwrap()).unwrap();
    assert!(vectors.len() > 1);
    vectors.pop();
    fs::write(gen_dir.join("vectors.bin"), bincode::serialize(&vectors).unwrap()).unwrap();

    let err = store(&dir).load(INDEX).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::IndexConsistency(IndexConsistencyError::LengthMismatch { .. })
    ));
}

#[tokio::test]
async fn test_vector_count_mismatch_forces_rebuild() {
    let dir = TempDir::new().unwrap();
    let gen_dir = built(&dir).await;
    let before = current_generation(&dir);

    let mut vectors: Vec<Vec<f32>> =
        bincode::deserialize(&fs::read(gen_dir.join("vectors.bin")).unwrap()).unwrap();
    vectors.pop();
    fs::write(gen_dir.join("vectors.bin"), bincode::serialize(&vectors).unwrap()).unwrap();

    let fresh = store(&dir);
    let hits = fresh.query(INDEX, "osprey", 1).await.unwrap();
    assert_eq!(hits[0].chunk.source, "field_notes.txt");

    assert_ne!(current_generation(&dir), before);
    let index = fresh.load(INDEX).await.unwrap().unwrap();
    assert_eq!(index.vectors.len(), index.chunks.len());
}

#[tokio::test]
async fn test_garbage_metadata_forces_rebuild() {
    let dir = TempDir::new().unwrap();
    let gen_dir = built(&dir).await;
    fs::write(gen_dir.join("chunks.json"), b"{ not json").unwrap();

    let fresh = store(&dir);
    assert!(matches!(
        fresh.load(INDEX).await.unwrap_err(),
        OrchestratorError::IndexConsistency(IndexConsistencyError::Corrupt { .. })
    ));
    assert!(!fresh.status(INDEX).await.unwrap().ready);

    let hits = fresh.query(INDEX, "curlew", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(fresh.status(INDEX).await.unwrap().ready);
}

#[tokio::test]
async fn test_truncated_vectors_force_rebuild() {
    let dir = TempDir::new().unwrap();
    let gen_dir = built(&dir).await;
    let bytes = fs::read(gen_dir.join("vectors.bin")).unwrap();
    fs::write(gen_dir.join("vectors.bin"), &bytes[..bytes.len() / 2]).unwrap();

    let fresh = store(&dir);
    let hits = fresh.query(INDEX, "plover", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn test_missing_manifest_forces_rebuild() {
    let dir = TempDir::new().unwrap();
    let gen_dir = built(&dir).await;
    let before = current_generation(&dir);
    fs::remove_file(gen_dir.join("manifest.json")).unwrap();

    let fresh = store(&dir);
    fresh.query(INDEX, "godwit", 1).await.unwrap();
    assert_ne!(current_generation(&dir), before);
}

#[tokio::test]
async fn test_wrong_dimension_vector_is_detected() {
    let dir = TempDir::new().unwrap();
    let gen_dir = built(&dir).await;

    let mut vectors: Vec<Vec<f32>> =
        bincode::deserialize(&fs::read(gen_dir.join("vectors.bin")).unwrap()).unwrap();
    vectors[0].truncate(8);
    fs::write(gen_dir.join("vectors.bin"), bincode::serialize(&vectors).unwrap()).unwrap();

    let err = store(&dir).load(INDEX).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::IndexConsistency(IndexConsistencyError::DimensionMismatch {
            expected: 32,
            actual: 8,
            ..
        })
    ));
}
