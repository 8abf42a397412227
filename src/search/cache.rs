// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TTL cache of successful web search responses

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::types::SearchResult;

/// Keyed by normalized query and requested result count
pub struct SearchCache {
    entries: RwLock<HashMap<(String, usize), CachedEntry>>,
    ttl: Duration,
    max_entries: usize,
}

struct CachedEntry {
    results: Vec<SearchResult>,
    provider: String,
    inserted_at: Instant,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total: usize,
    /// Expired entries not yet evicted
    pub expired: usize,
    pub max: usize,
}

impl SearchCache {
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
            max_entries: max_entries.max(1),
        }
    }

    /// Lower-cased, whitespace-collapsed query
    pub fn normalize(query: &str) -> String {
        query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Cached results and the provider that produced them, unless expired
    pub fn get(&self, query: &str, num_results: usize) -> Option<(Vec<SearchResult>, String)> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&(Self::normalize(query), num_results))?;

        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }

        Some((entry.results.clone(), entry.provider.clone()))
    }

    pub fn insert(&self, query: &str, num_results: usize, results: &[SearchResult], provider: &str) {
        let mut entries = match self.entries.write() {
            Ok(e) => e,
            Err(_) => return,
        };

        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted_at.elapsed() <= ttl);

        let key = (Self::normalize(query), num_results);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedEntry {
                results: results.to_vec(),
                provider: provider.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub fn stats(&self) -> CacheStats {
        match self.entries.read() {
            Ok(entries) => CacheStats {
                total: entries.len(),
                expired: entries
                    .values()
                    .filter(|e| e.inserted_at.elapsed() > self.ttl)
                    .count(),
                max: self.max_entries,
            },
            Err(_) => CacheStats {
                total: 0,
                expired: 0,
                max: self.max_entries,
            },
        }
    }
}
