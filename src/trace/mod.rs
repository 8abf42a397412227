// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Trace persistence
//!
//! One pretty-printed JSON file per request in an append-only directory, named
//! `trace_{timestamp}_{request_id}.json`. Existing files are never overwritten.

pub mod types;

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::TraceError;
use crate::utils::write_new;

pub use types::{EvidenceRef, SpecialistRecord, Trace};

const TRACE_PREFIX: &str = "trace_";
const TRACE_SUFFIX: &str = ".json";

#[async_trait]
pub trait TraceRecorder: Send + Sync {
    /// Persist `trace` and return a locator usable with `load`
    async fn record(&self, trace: &Trace) -> Result<String, TraceError>;
}

pub struct FileTraceRecorder {
    dir: PathBuf,
}

impl FileTraceRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(trace: &Trace) -> String {
        format!(
            "{}{}_{}{}",
            TRACE_PREFIX,
            trace.timestamp.format("%Y%m%d_%H%M%S_%3f"),
            trace.request_id.simple(),
            TRACE_SUFFIX
        )
    }

    fn is_trace_name(name: &str) -> bool {
        name.starts_with(TRACE_PREFIX)
            && name.ends_with(TRACE_SUFFIX)
            && !name.contains(['/', '\\'])
            && name != ".."
    }

    /// Map a locator (file name or path inside the trace directory) to a file
    fn resolve(&self, locator: &str) -> Result<PathBuf, TraceError> {
        let candidate = Path::new(locator);
        let name = candidate
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| Self::is_trace_name(n))
            .ok_or_else(|| TraceError::InvalidLocator(locator.to_string()))?;

        if let Some(parent) = candidate.parent().filter(|p| !p.as_os_str().is_empty()) {
            let parent = std::fs::canonicalize(parent)
                .map_err(|_| TraceError::NotFound(locator.to_string()))?;
            let dir = std::fs::canonicalize(&self.dir)
                .map_err(|_| TraceError::NotFound(locator.to_string()))?;
            if parent != dir {
                return Err(TraceError::InvalidLocator(locator.to_string()));
            }
        }

        Ok(self.dir.join(name))
    }

    /// Trace file names, newest first
    pub async fn list(&self) -> Result<Vec<String>, TraceError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if Self::is_trace_name(&name) && entry.file_type().await?.is_file() {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    pub async fn load(&self, locator: &str) -> Result<Trace, TraceError> {
        let path = self.resolve(locator)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TraceError::NotFound(locator.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TraceRecorder for FileTraceRecorder {
    async fn record(&self, trace: &Trace) -> Result<String, TraceError> {
        let path = self.dir.join(Self::file_name(trace));
        let bytes = serde_json::to_vec_pretty(trace)?;
        write_new(&path, &bytes).await?;

        info!("Saved trace {} to {:?}", trace.request_id, path);
        debug!("Trace size: {} bytes", bytes.len());
        Ok(path.display().to_string())
    }
}
