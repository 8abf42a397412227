// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::specialists::{RetrievalResult, SpecialistKind};

/// One inbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Reference to an uploaded document, if any
    pub attachment: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// In routing order
    pub specialists_used: Vec<SpecialistKind>,
    pub rationale: String,
    pub trace_locator: Option<String>,
    /// Set when the trace could not be persisted; the answer is still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_error: Option<String>,
    pub results: Vec<RetrievalResult>,
}

impl QueryResponse {
    pub fn trace_degraded(&self) -> bool {
        self.trace_error.is_some()
    }
}

/// Result of storing an uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Original file name
    pub filename: String,
    pub stored_path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorStatus {
    pub name: String,
    pub available: bool,
    pub detail: String,
}

/// Collaborator availability, computed without network calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub collaborators: Vec<CollaboratorStatus>,
}

impl EnvironmentReport {
    pub fn get(&self, name: &str) -> Option<&CollaboratorStatus> {
        self.collaborators.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for EnvironmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for status in &self.collaborators {
            let mark = if status.available { "ok" } else { "--" };
            writeln!(f, "[{}] {:<18} {}", mark, status.name, status.detail)?;
        }
        Ok(())
    }
}
