// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query router
//!
//! An ordered table of rules, each a predicate over (lower-cased query, attachment
//! present) with the specialists it selects and a rationale sentence. The first
//! matching rule wins. New routes are new table rows.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::specialists::SpecialistKind;

/// Predicate over the lower-cased query text and attachment state
#[derive(Debug, Clone)]
pub enum Condition {
    Attachment(bool),
    /// Any of the keywords occurs as a substring
    AnyKeyword(Vec<String>),
    All(Vec<Condition>),
    Always,
}

impl Condition {
    pub fn keywords(words: &[&str]) -> Self {
        Condition::AnyKeyword(words.iter().map(|w| w.to_lowercase()).collect())
    }

    fn matches(&self, lowered_query: &str, has_attachment: bool) -> bool {
        match self {
            Condition::Attachment(expected) => has_attachment == *expected,
            Condition::AnyKeyword(words) => words.iter().any(|w| lowered_query.contains(w.as_str())),
            Condition::All(conditions) => conditions
                .iter()
                .all(|c| c.matches(lowered_query, has_attachment)),
            Condition::Always => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub name: String,
    pub condition: Condition,
    pub specialists: Vec<SpecialistKind>,
    pub rationale: String,
}

impl RoutingRule {
    pub fn new(
        name: &str,
        condition: Condition,
        specialists: &[SpecialistKind],
        rationale: &str,
    ) -> Self {
        let mut unique: Vec<SpecialistKind> = Vec::with_capacity(specialists.len());
        for kind in specialists {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }

        Self {
            name: name.to_string(),
            condition,
            specialists: unique,
            rationale: rationale.to_string(),
        }
    }
}

/// Which specialists run for a request, and why; immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Ordered, without duplicates
    pub specialists: Vec<SpecialistKind>,
    pub rationale: String,
    /// Name of the rule that fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

const RATIONALE_SEPARATOR: &str = " ; ";
const NO_MATCH_RATIONALE: &str = "No routing rule matched the query.";

pub struct Router {
    rules: Vec<RoutingRule>,
    note: Option<String>,
}

impl Router {
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self { rules, note: None }
    }

    /// The five built-in rules, in evaluation order
    pub fn default_rules() -> Vec<RoutingRule> {
        use SpecialistKind::*;

        vec![
            RoutingRule::new(
                "attachment_summary",
                Condition::All(vec![
                    Condition::Attachment(true),
                    Condition::keywords(&["summarize", "summary"]),
                ]),
                &[DocumentRetriever],
                "Document attached and a summary was requested: Document Retriever selected.",
            ),
            RoutingRule::new(
                "literature_keywords",
                Condition::keywords(&["arxiv", "papers"]),
                &[LiteratureSearch],
                "Query mentions 'arxiv' or 'papers': Literature Search Specialist selected.",
            ),
            RoutingRule::new(
                "recency_keywords",
                Condition::keywords(&["recent", "latest", "news"]),
                &[WebSearch],
                "Query mentions 'recent', 'latest' or 'news': Web Search Specialist selected.",
            ),
            RoutingRule::new(
                "attachment_present",
                Condition::Attachment(true),
                &[DocumentRetriever],
                "Document attached: Document Retriever selected to fetch relevant sections.",
            ),
            RoutingRule::new(
                "fallback_fan_out",
                Condition::Always,
                &[WebSearch, LiteratureSearch],
                "No document attached and no specific intent: Web Search and Literature Search as fallback.",
            ),
        ]
    }

    pub fn with_default_rules() -> Self {
        Self::new(Self::default_rules())
    }

    /// Informational sentence appended to every rationale
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Pure decision procedure over (query, attachment present)
    pub fn route(&self, query: &str, has_attachment: bool) -> RoutingDecision {
        let lowered = query.to_lowercase();
        let matched = self
            .rules
            .iter()
            .find(|rule| rule.condition.matches(&lowered, has_attachment));

        let mut sentences = Vec::with_capacity(2);
        let decision = match matched {
            Some(rule) => {
                sentences.push(rule.rationale.as_str());
                RoutingDecision {
                    specialists: rule.specialists.clone(),
                    rationale: String::new(),
                    rule: Some(rule.name.clone()),
                }
            }
            None => {
                sentences.push(NO_MATCH_RATIONALE);
                RoutingDecision {
                    specialists: Vec::new(),
                    rationale: String::new(),
                    rule: None,
                }
            }
        };
        if let Some(note) = self.note.as_deref() {
            sentences.push(note);
        }

        let decision = RoutingDecision {
            rationale: sentences.join(RATIONALE_SEPARATOR),
            ..decision
        };
        info!(
            "Router decision: {:?} via {} ({})",
            decision.specialists,
            decision.rule.as_deref().unwrap_or("no rule"),
            decision.rationale
        );
        decision
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
