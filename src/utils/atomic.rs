// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crash-safe file writes
//!
//! Content goes to a uniquely named sibling temp file, is synced, then renamed
//! over the destination, so readers see either the old bytes or the new bytes.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp-{}", name, uuid::Uuid::new_v4().simple()))
}

async fn write_temp(path: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let temp_path = temp_sibling(path);
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(temp_path)
}

/// Write `bytes` to `path`, replacing any existing file atomically
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = write_temp(path, bytes).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Write `bytes` to `path` only if nothing exists there yet
///
/// Fails with `AlreadyExists` instead of replacing; used for append-only records.
pub async fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = write_temp(path, bytes).await?;
    // hard_link fails if the destination exists, unlike rename
    let linked = fs::hard_link(&temp_path, path).await;
    let _ = fs::remove_file(&temp_path).await;
    linked
}
