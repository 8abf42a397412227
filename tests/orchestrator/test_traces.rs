// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use nebula_orchestrator::aggregator::{Collaborators, Orchestrator, Query};
use nebula_orchestrator::config::OrchestratorConfig;
use nebula_orchestrator::embeddings::HashingEmbedder;
use nebula_orchestrator::errors::TraceError;
use nebula_orchestrator::router::Router;
use nebula_orchestrator::specialists::{
    EvidenceItem, Provenance, RetrievalResult, Specialist, SpecialistKind,
};
use nebula_orchestrator::synthesis::Synthesizer;
use nebula_orchestrator::trace::{FileTraceRecorder, Trace, TraceRecorder};
use nebula_orchestrator::vector::VectorIndexStore;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct FixedWeb;

#[async_trait]
impl Specialist for FixedWeb {
    fn kind(&self) -> SpecialistKind {
        SpecialistKind::WebSearch
    }

    async fn retrieve(&self, _query: &str, _top_k: usize) -> RetrievalResult {
        RetrievalResult::ok(
            SpecialistKind::WebSearch,
            "stub",
            vec![EvidenceItem::Web {
                title: "Tokamak record".to_string(),
                snippet: "A new confinement record.".to_string(),
                link: "https://example.org/tokamak".to_string(),
            }],
        )
    }
}

struct Echo;

#[async_trait]
impl Synthesizer for Echo {
    fn provider(&self) -> &str {
        "ECHO"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn synthesize(&self, query: &str, _context: &str) -> String {
        format!("answer to {}", query)
    }
}

struct BrokenRecorder;

#[async_trait]
impl TraceRecorder for BrokenRecorder {
    async fn record(&self, _trace: &Trace) -> Result<String, TraceError> {
        Err(TraceError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "read-only volume",
        )))
    }
}

fn orchestrator(dir: &TempDir, recorder: Arc<dyn TraceRecorder>) -> Orchestrator {
    let config = OrchestratorConfig::with_data_dir(dir.path());
    let store = Arc::new(
        VectorIndexStore::from_config(&config, Arc::new(HashingEmbedder::new(16).unwrap())).unwrap(),
    );
    Orchestrator::new(
        config,
        Router::with_default_rules(),
        Collaborators {
            store,
            specialists: vec![Arc::new(FixedWeb)],
            synthesizer: Arc::new(Echo),
            recorder,
        },
    )
}

fn file_recorder(dir: &TempDir) -> Arc<FileTraceRecorder> {
    Arc::new(FileTraceRecorder::new(dir.path().join("logs")))
}

#[tokio::test]
async fn test_trace_matches_response() {
    let dir = TempDir::new().unwrap();
    let recorder = file_recorder(&dir);
    let orchestrator = orchestrator(&dir, recorder.clone());

    let response = orchestrator
        .handle_query(&Query::new("latest fusion news"))
        .await
        .unwrap();
    let locator = response.trace_locator.clone().unwrap();
    assert!(Path::new(&locator).is_file());

    let trace = recorder.load(&locator).await.unwrap();
    assert_eq!(trace.input, "latest fusion news");
    assert_eq!(trace.attachment, None);
    assert_eq!(trace.answer, response.answer);
    assert_eq!(trace.specialists_invoked, response.specialists_used);
    assert_eq!(trace.decision.rationale, response.rationale);
    assert_eq!(trace.decision.rule.as_deref(), Some("recency_keywords"));
    assert_eq!(trace.specialist_results[0].evidence_count, 1);
    assert_eq!(
        trace.documents_retrieved[0].provenance,
        Provenance::Web {
            title: "Tokamak record".to_string(),
            link: "https://example.org/tokamak".to_string(),
        }
    );
}

#[tokio::test]
async fn test_trace_file_is_self_describing_json() {
    let dir = TempDir::new().unwrap();
    let recorder = file_recorder(&dir);
    let orchestrator = orchestrator(&dir, recorder.clone());

    let response = orchestrator
        .handle_query(&Query::new("recent results").with_attachment("notes.pdf"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(response.trace_locator.unwrap()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    for key in ["request_id", "timestamp", "input", "decision", "specialists_invoked", "answer"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["attachment"], "notes.pdf");
    assert_eq!(value["specialists_invoked"][0], "web_search");
}

#[tokio::test]
async fn test_one_trace_per_request_newest_first() {
    let dir = TempDir::new().unwrap();
    let recorder = file_recorder(&dir);
    let orchestrator = orchestrator(&dir, recorder.clone());

    let mut locators = Vec::new();
    for query in ["news one", "news two", "news three"] {
        let response = orchestrator.handle_query(&Query::new(query)).await.unwrap();
        locators.push(response.trace_locator.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let names = recorder.list().await.unwrap();
    assert_eq!(names.len(), 3);

    let newest = recorder.load(&names[0]).await.unwrap();
    assert_eq!(newest.input, "news three");
    let oldest = recorder.load(&names[2]).await.unwrap();
    assert_eq!(oldest.input, "news one");

    let by_path = recorder.load(&locators[1]).await.unwrap();
    let by_name = recorder.load(&names[1]).await.unwrap();
    assert_eq!(by_path, by_name);
}

#[tokio::test]
async fn test_trace_failure_keeps_answer() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&dir, Arc::new(BrokenRecorder));

    let response = orchestrator
        .handle_query(&Query::new("latest fusion news"))
        .await
        .unwrap();

    assert_eq!(response.answer, "answer to latest fusion news");
    assert!(response.trace_degraded());
    assert!(response.trace_locator.is_none());
    assert!(response.trace_error.unwrap().contains("read-only volume"));
}

#[tokio::test]
async fn test_load_rejects_foreign_locators() {
    let dir = TempDir::new().unwrap();
    let recorder = file_recorder(&dir);
    std::fs::create_dir_all(recorder.dir()).unwrap();

    assert!(matches!(
        recorder.load("../secrets.json").await.unwrap_err(),
        TraceError::InvalidLocator(_)
    ));
    assert!(matches!(
        recorder.load("trace_20250101_000000_000_missing.json").await.unwrap_err(),
        TraceError::NotFound(_)
    ));

    let outside = TempDir::new().unwrap();
    let foreign = outside.path().join("trace_20250101_000000_000_x.json");
    std::fs::write(&foreign, "{}").unwrap();
    assert!(matches!(
        recorder.load(&foreign.display().to_string()).await.unwrap_err(),
        TraceError::InvalidLocator(_)
    ));
}

#[tokio::test]
async fn test_empty_trace_directory_lists_nothing() {
    let dir = TempDir::new().unwrap();
    assert!(file_recorder(&dir).list().await.unwrap().is_empty());
}
