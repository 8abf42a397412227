// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Document side of retrieval: admission, text extraction and word-window chunking

pub mod chunker;
pub mod extract;

pub use chunker::{chunk_document, chunk_text};
pub use extract::{admit, extract_document, list_documents, ExtractedDocument};
