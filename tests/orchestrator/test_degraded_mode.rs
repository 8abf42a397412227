// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use nebula_orchestrator::aggregator::{Orchestrator, Query};
use nebula_orchestrator::config::{EmbeddingProviderKind, OrchestratorConfig};
use nebula_orchestrator::errors::OrchestratorError;
use nebula_orchestrator::specialists::{EvidenceItem, SpecialistKind};
use std::fs;
use tempfile::TempDir;
use tokio_test::assert_ok;

/// Production wiring with no credentials, no network collaborators and no model files
fn offline(dir: &TempDir) -> Orchestrator {
    let mut config = OrchestratorConfig::with_data_dir(dir.path());
    config.literature.enabled = false;
    config.embedding.provider = EmbeddingProviderKind::Hashing;
    config.embedding.dimension = 64;
    Orchestrator::from_config(config).unwrap()
}

#[tokio::test]
async fn test_recency_query_without_keys_still_answers() {
    let dir = TempDir::new().unwrap();
    let orchestrator = offline(&dir);

    let response = orchestrator
        .handle_query(&Query::new("What's the latest news on fusion?"))
        .await
        .unwrap();

    assert_eq!(response.specialists_used, vec![SpecialistKind::WebSearch]);
    let web = &response.results[0];
    assert_eq!(web.source, "fallback");
    assert!(web.is_degraded());
    match &web.evidence[0] {
        EvidenceItem::Web { title, .. } => assert_eq!(title, "No API key provided"),
        other => panic!("unexpected evidence {:?}", other),
    }

    assert!(!response.answer.is_empty());
    assert!(response.answer.contains("GROQ synthesis unavailable"));
    assert!(response.answer.contains("No API key provided"));
    assert!(response.trace_locator.is_some());
    assert!(!response.trace_degraded());
}

#[tokio::test]
async fn test_fan_out_without_keys_keeps_routing_order() {
    let dir = TempDir::new().unwrap();
    let orchestrator = offline(&dir);

    let response = assert_ok!(orchestrator.handle_query(&Query::new("hello")).await);

    assert_eq!(
        response.specialists_used,
        vec![SpecialistKind::WebSearch, SpecialistKind::LiteratureSearch]
    );
    assert!(response.results.iter().all(|r| r.source == "fallback"));

    let passages: Vec<&str> = response.answer.split("\n\n").collect();
    assert!(passages.len() >= 2);
    let web_at = response.answer.find("No API key provided").unwrap();
    let literature_at = response.answer.find("Literature search unavailable").unwrap();
    assert!(web_at < literature_at);
    assert!(response.rationale.contains("LLM_PROVIDER=GROQ"));
}

#[tokio::test]
async fn test_attachment_summary_uses_local_index() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("sample_pdfs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("report.txt"),
        "The quarterly report shows turbine efficiency improved across every wind farm.",
    )
    .unwrap();
    let orchestrator = offline(&dir);

    let response = orchestrator
        .handle_query(&Query::new("Summarize this PDF").with_attachment("report.txt"))
        .await
        .unwrap();

    assert_eq!(response.specialists_used, vec![SpecialistKind::DocumentRetriever]);
    let docs_result = &response.results[0];
    assert!(docs_result.is_ok());
    assert_eq!(docs_result.source, "vector_index");
    assert!(response.answer.contains("[Excerpt 1 from report.txt]"));
    assert!(response.answer.contains("turbine efficiency"));
}

#[tokio::test]
async fn test_attachment_with_empty_corpus_gives_notice() {
    let dir = TempDir::new().unwrap();
    let orchestrator = offline(&dir);

    let response = orchestrator
        .handle_query(&Query::new("What does it say about budgets?").with_attachment("missing.pdf"))
        .await
        .unwrap();

    assert_eq!(response.specialists_used, vec![SpecialistKind::DocumentRetriever]);
    assert!(response.results[0].evidence.is_empty());
    assert_eq!(
        response.answer,
        "No indexed document content is available for this query."
    );
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let dir = TempDir::new().unwrap();
    let orchestrator = offline(&dir);

    let err = orchestrator.handle_query(&Query::new("   ")).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidQuery(_)));
    assert_eq!(err.error_code(), "INVALID_QUERY");
}

#[tokio::test]
async fn test_invalid_configuration_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = OrchestratorConfig::with_data_dir(dir.path());
    config.chunking.overlap_words = config.chunking.window_words;

    let err = Orchestrator::from_config(config).err().unwrap();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_environment_report_without_credentials() {
    let dir = TempDir::new().unwrap();
    let orchestrator = offline(&dir);
    let report = orchestrator.environment_report().await;

    assert!(!report.get("GROQ synthesis").unwrap().available);
    assert!(!report.get("SerpAPI").unwrap().available);
    assert_eq!(report.get("Brave Search").unwrap().detail, "missing BRAVE_API_KEY");
    assert!(!report.get("arXiv").unwrap().available);
    assert_eq!(report.get("Embedder").unwrap().detail, "hashing-64 (64D)");
    assert!(!report.get("Vector index").unwrap().available);

    let printed = report.to_string();
    assert!(printed.contains("[--] SerpAPI"));
    assert!(printed.contains("[ok] Embedder"));
}

#[tokio::test]
async fn test_missing_embedding_model_degrades_document_retrieval() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("sample_pdfs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("notes.txt"), "Wind turbines convert kinetic energy.").unwrap();

    let mut config = OrchestratorConfig::with_data_dir(dir.path());
    config.literature.enabled = false;
    let orchestrator = assert_ok!(Orchestrator::from_config(config));

    let report = orchestrator.environment_report().await;
    let embedder = report.get("Embedder").unwrap();
    assert!(!embedder.available);
    assert!(embedder.detail.starts_with("sentence-transformers/all-MiniLM-L6-v2 (384D)"));
    assert!(embedder.detail.contains("model.onnx"));

    let response = orchestrator
        .handle_query(&Query::new("Summarize this PDF").with_attachment("notes.txt"))
        .await
        .unwrap();

    assert!(response.results[0].is_error());
    assert_eq!(response.answer, "No results found.");
}
