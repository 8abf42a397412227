// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod distance;
pub mod index_store;
pub mod types;

pub use distance::{euclidean_distance, nearest};
pub use index_store::{LoadedIndex, VectorIndexStore};
pub use types::{
    BuildReport, ChunkRecord, DocumentChunk, IndexHit, IndexManifest, IndexStatus,
    IndexedDocument, IngestionFailure,
};
