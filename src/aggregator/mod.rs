// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request orchestration
//!
//! route -> specialists (concurrently, each under its own timeout) -> one synthesis
//! per specialist -> answer in routing order -> trace.

pub mod types;

use futures::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::embeddings::build_embedder;
use crate::errors::OrchestratorError;
use crate::rag::extract::{admit, list_documents, source_name};
use crate::router::Router;
use crate::search::{ArxivProvider, SearchService};
use crate::specialists::{
    format_context, DocumentRetriever, LiteratureSearchSpecialist, RetrievalResult, Specialist,
    SpecialistKind, WebSearchSpecialist,
};
use crate::synthesis::{unavailable_passage, ChatSynthesizer, Synthesizer};
use crate::trace::{FileTraceRecorder, Trace, TraceRecorder};
use crate::utils::write_atomic;
use crate::vector::{BuildReport, VectorIndexStore};

pub use types::{
    CollaboratorStatus, EnvironmentReport, Query, QueryResponse, UploadReceipt,
};

pub const NO_RESULTS_ANSWER: &str = "No results found.";
const PASSAGE_SEPARATOR: &str = "\n\n";

/// Injected collaborators
pub struct Collaborators {
    pub store: Arc<VectorIndexStore>,
    pub specialists: Vec<Arc<dyn Specialist>>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub recorder: Arc<dyn TraceRecorder>,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    router: Router,
    store: Arc<VectorIndexStore>,
    specialists: HashMap<SpecialistKind, Arc<dyn Specialist>>,
    synthesizer: Arc<dyn Synthesizer>,
    recorder: Arc<dyn TraceRecorder>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, router: Router, collaborators: Collaborators) -> Self {
        let specialists = collaborators
            .specialists
            .into_iter()
            .map(|s| (s.kind(), s))
            .collect();

        Self {
            config,
            router,
            store: collaborators.store,
            specialists,
            synthesizer: collaborators.synthesizer,
            recorder: collaborators.recorder,
        }
    }

    /// Wire up the production collaborators from configuration
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        config.validate()?;

        let embedder = build_embedder(&config.embedding, config.timeouts.embedding())?;
        let store = Arc::new(VectorIndexStore::from_config(&config, embedder)?);
        let search = Arc::new(SearchService::new(config.search.clone()));
        let literature = Arc::new(ArxivProvider::new(config.literature.clone()));
        let synthesizer = Arc::new(ChatSynthesizer::new(
            config.synthesis.clone(),
            config.timeouts.synthesis(),
        ));

        let specialists: Vec<Arc<dyn Specialist>> = vec![
            Arc::new(DocumentRetriever::new(store.clone(), config.paths.index_name.clone())),
            Arc::new(WebSearchSpecialist::new(search)),
            Arc::new(LiteratureSearchSpecialist::new(literature)),
        ];

        let router = Router::with_default_rules().with_note(format!(
            "LLM_PROVIDER={} (used for answer synthesis).",
            config.synthesis.provider
        ));
        let recorder = Arc::new(FileTraceRecorder::new(config.paths.trace_dir.clone()));

        Ok(Self::new(
            config,
            router,
            Collaborators {
                store,
                specialists,
                synthesizer,
                recorder,
            },
        ))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<VectorIndexStore> {
        &self.store
    }

    fn top_k(&self, kind: SpecialistKind) -> usize {
        match kind {
            SpecialistKind::DocumentRetriever => self.config.retrieval.document_top_k,
            SpecialistKind::WebSearch => self.config.retrieval.web_top_k,
            SpecialistKind::LiteratureSearch => self.config.retrieval.literature_top_k,
        }
    }

    async fn run_specialist(&self, kind: SpecialistKind, query: &str) -> RetrievalResult {
        let Some(specialist) = self.specialists.get(&kind) else {
            warn!("No {} configured", kind.display_name());
            return RetrievalResult::error(kind, "specialist not configured", Vec::new());
        };

        let timeout = self.config.timeouts.specialist();
        match tokio::time::timeout(timeout, specialist.retrieve(query, self.top_k(kind))).await {
            Ok(result) => {
                debug!(
                    "{} returned {} evidence items from {}",
                    kind.display_name(),
                    result.evidence.len(),
                    result.source
                );
                result
            }
            Err(_) => {
                warn!("{} timed out after {}ms", kind.display_name(), timeout.as_millis());
                RetrievalResult::error(
                    kind,
                    format!("timed out after {}ms", timeout.as_millis()),
                    Vec::new(),
                )
            }
        }
    }

    async fn passage_for(&self, query: &str, result: &RetrievalResult) -> Option<String> {
        // Failed invocations contribute nothing; their placeholders stay in the trace
        if result.is_error() {
            debug!(
                "Skipping synthesis for failed {}",
                result.specialist.display_name()
            );
            return None;
        }
        if result.evidence.is_empty() {
            return result.notice.clone();
        }

        let context = format_context(&result.evidence, self.config.retrieval.context_items);
        let timeout = self.config.timeouts.synthesis();
        match tokio::time::timeout(timeout, self.synthesizer.synthesize(query, &context)).await {
            Ok(passage) => Some(passage),
            Err(_) => {
                warn!(
                    "Synthesis for {} timed out after {}ms",
                    result.specialist.display_name(),
                    timeout.as_millis()
                );
                Some(unavailable_passage(
                    self.synthesizer.provider(),
                    &format!("timed out after {}ms", timeout.as_millis()),
                    &context,
                ))
            }
        }
    }

    /// Answer one query
    ///
    /// Only invalid configuration or an empty query fail the request. Provider
    /// failures degrade individual specialist results, and a trace write failure
    /// is reported in `QueryResponse::trace_error`.
    pub async fn handle_query(&self, query: &Query) -> Result<QueryResponse, OrchestratorError> {
        self.config.validate()?;
        let text = query.text.trim();
        if text.is_empty() {
            return Err(OrchestratorError::InvalidQuery("query is required".to_string()));
        }

        let decision = self.router.route(text, query.has_attachment());

        let results: Vec<RetrievalResult> = join_all(
            decision
                .specialists
                .iter()
                .map(|kind| self.run_specialist(*kind, text)),
        )
        .await;

        let passages: Vec<String> = join_all(results.iter().map(|r| self.passage_for(text, r)))
            .await
            .into_iter()
            .flatten()
            .collect();

        let answer = if passages.is_empty() {
            NO_RESULTS_ANSWER.to_string()
        } else {
            passages.join(PASSAGE_SEPARATOR)
        };

        let trace = Trace::new(
            text,
            query.attachment.clone(),
            decision.clone(),
            &results,
            answer.clone(),
        );
        let (trace_locator, trace_error) = match self.recorder.record(&trace).await {
            Ok(locator) => (Some(locator), None),
            Err(e) => {
                warn!("Failed to record trace {}: {}", trace.request_id, e);
                (None, Some(e.to_string()))
            }
        };

        info!(
            "Answered query with {} specialists ({} passages)",
            results.len(),
            passages.len()
        );

        Ok(QueryResponse {
            answer,
            specialists_used: results.iter().map(|r| r.specialist).collect(),
            rationale: decision.rationale,
            trace_locator,
            trace_error,
            results,
        })
    }

    /// Store a document for retrieval and invalidate the default index
    ///
    /// Type and size limits are enforced before anything is copied. The next
    /// document query rebuilds the index from the whole documents directory.
    pub async fn upload_document(&self, path: &Path) -> Result<UploadReceipt, OrchestratorError> {
        let size_bytes = admit(path, &self.config.limits)?;
        let filename = source_name(path);
        let stored_path = self
            .config
            .paths
            .documents_dir
            .join(format!("{}_{}", uuid::Uuid::new_v4().simple(), filename));

        let bytes = tokio::fs::read(path).await?;
        write_atomic(&stored_path, &bytes).await?;
        self.store.invalidate(&self.config.paths.index_name).await?;

        info!("Saved uploaded document to {:?}", stored_path);
        Ok(UploadReceipt {
            filename,
            stored_path,
            size_bytes,
        })
    }

    /// Rebuild the default index from the documents directory
    pub async fn rebuild_index(&self) -> Result<BuildReport, OrchestratorError> {
        let paths = list_documents(&self.config.paths.documents_dir, &self.config.limits)?;
        self.store.build(&paths, &self.config.paths.index_name).await
    }

    pub async fn environment_report(&self) -> EnvironmentReport {
        let mut collaborators = Vec::new();
        let synthesis = &self.config.synthesis;

        collaborators.push(CollaboratorStatus {
            name: format!("{} synthesis", synthesis.provider),
            available: self.synthesizer.is_available(),
            detail: if self.synthesizer.is_available() {
                format!("model {} at {}", synthesis.model, synthesis.api_url)
            } else {
                format!("missing {}_API_KEY", synthesis.provider.to_uppercase())
            },
        });

        let keys = &self.config.search.providers;
        for (name, key, var) in [
            ("SerpAPI", &keys.serpapi_api_key, "SERPAPI_KEY"),
            ("Brave Search", &keys.brave_api_key, "BRAVE_API_KEY"),
        ] {
            let available = self.config.search.enabled && key.is_some();
            collaborators.push(CollaboratorStatus {
                name: name.to_string(),
                available,
                detail: if !self.config.search.enabled {
                    "web search disabled".to_string()
                } else if available {
                    "key loaded".to_string()
                } else {
                    format!("missing {}", var)
                },
            });
        }

        collaborators.push(CollaboratorStatus {
            name: "arXiv".to_string(),
            available: self.config.literature.enabled,
            detail: if self.config.literature.enabled {
                self.config.literature.api_url.clone()
            } else {
                "literature search disabled".to_string()
            },
        });

        let embedder = self.store.embedder();
        let identity = format!("{} ({}D)", embedder.model_id(), embedder.dimension());
        let unavailable = embedder.unavailable_reason();
        collaborators.push(CollaboratorStatus {
            name: "Embedder".to_string(),
            available: unavailable.is_none(),
            detail: match unavailable {
                Some(reason) => format!("{}: {}", identity, reason),
                None => identity,
            },
        });

        let index_name = &self.config.paths.index_name;
        let index = match self.store.status(index_name).await {
            Ok(status) if status.ready => CollaboratorStatus {
                name: "Vector index".to_string(),
                available: true,
                detail: format!(
                    "'{}' ready: {} chunks, generation {}",
                    index_name,
                    status.chunk_count,
                    status.generation.unwrap_or_default()
                ),
            },
            Ok(_) => CollaboratorStatus {
                name: "Vector index".to_string(),
                available: false,
                detail: format!("'{}' not built yet (built on first document query)", index_name),
            },
            Err(e) => CollaboratorStatus {
                name: "Vector index".to_string(),
                available: false,
                detail: e.to_string(),
            },
        };
        collaborators.push(index);

        EnvironmentReport { collaborators }
    }
}
