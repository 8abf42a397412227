// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document admission and text extraction
//!
//! Oversized or wrong-type documents are rejected here, before any text reaches
//! the chunker.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DocumentLimits;
use crate::errors::IngestionError;

/// Lower-cased extension of `path`, empty if none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Check type and size limits; returns the document size in bytes
pub fn admit(path: &Path, limits: &DocumentLimits) -> Result<u64, IngestionError> {
    let extension = extension_of(path);
    if !limits.allowed_extensions.iter().any(|e| *e == extension) {
        return Err(IngestionError::UnsupportedType {
            path: path.to_path_buf(),
            extension,
        });
    }

    let size_bytes = fs::metadata(path)
        .map_err(|source| IngestionError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if size_bytes > limits.max_document_bytes {
        return Err(IngestionError::TooLarge {
            path: path.to_path_buf(),
            size_bytes,
            limit_bytes: limits.max_document_bytes,
        });
    }

    Ok(size_bytes)
}

/// Extracted text of one document
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// File name, used as the chunk source identifier
    pub source: String,
    pub text: String,
    /// Hex SHA-256 of the raw bytes
    pub content_sha256: String,
}

/// Admit and extract the text of a single document
///
/// PDF pages are extracted with `pdf-extract`; `.txt` and `.md` are read as UTF-8.
pub fn extract_document(
    path: &Path,
    limits: &DocumentLimits,
) -> Result<ExtractedDocument, IngestionError> {
    admit(path, limits)?;

    let bytes = fs::read(path).map_err(|source| IngestionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let text = match extension_of(path).as_str() {
        "pdf" => extract_pdf_text(path, &bytes)?,
        _ => String::from_utf8(bytes.clone()).map_err(|e| IngestionError::Unparsable {
            path: path.to_path_buf(),
            reason: format!("not valid UTF-8: {}", e),
        })?,
    };

    if text.split_whitespace().next().is_none() {
        return Err(IngestionError::EmptyText {
            path: path.to_path_buf(),
        });
    }

    let digest = {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(&bytes))
    };

    Ok(ExtractedDocument {
        source: source_name(path),
        text,
        content_sha256: digest,
    })
}

fn extract_pdf_text(path: &Path, bytes: &[u8]) -> Result<String, IngestionError> {
    // pdf-extract panics on some malformed inputs
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(IngestionError::Unparsable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
        Err(_) => Err(IngestionError::Unparsable {
            path: path.to_path_buf(),
            reason: "PDF parser aborted on malformed input".to_string(),
        }),
    }
}

/// File name of `path` as a source identifier
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// All admissible documents directly inside `dir`, sorted by path
///
/// A missing directory yields an empty list.
pub fn list_documents(dir: &Path, limits: &DocumentLimits) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && limits.allowed_extensions.contains(&extension_of(&path)) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
