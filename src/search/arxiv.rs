// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! arXiv literature provider
//!
//! Queries the public Atom API sorted by submission date, newest first, and
//! parses entries with quick-xml's event reader.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::config::LiteratureConfig;
use super::provider::LiteratureProvider;
use super::types::{validate_query, LiteratureRecord, SearchError};

pub struct ArxivProvider {
    client: Client,
    config: LiteratureConfig,
}

impl ArxivProvider {
    pub fn new(config: LiteratureConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// `"q" OR "q AI" OR "q research"` across all fields
    pub fn expand_query(query: &str) -> String {
        let q = query.replace('"', " ");
        let q = q.split_whitespace().collect::<Vec<_>>().join(" ");
        format!(
            "all:\"{q}\" OR all:\"{q} AI\" OR all:\"{q} research\"",
            q = q
        )
    }

    fn within_age(&self, record: &LiteratureRecord, now: DateTime<Utc>) -> bool {
        let Some(max_age_days) = self.config.max_age_days else {
            return true;
        };
        match DateTime::parse_from_rfc3339(&record.published) {
            Ok(published) => {
                now.signed_duration_since(published.with_timezone(&Utc))
                    <= ChronoDuration::days(i64::from(max_age_days))
            }
            Err(_) => true,
        }
    }
}

#[async_trait]
impl LiteratureProvider for ArxivProvider {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<LiteratureRecord>, SearchError> {
        if !self.config.enabled {
            return Err(SearchError::SearchDisabled);
        }
        let query = validate_query(query)?;
        let search_query = Self::expand_query(query);
        let max = max_results.to_string();

        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(e, self.config.request_timeout_ms))?;

        let status = response.status();
        if status == 429 {
            return Err(SearchError::RateLimited {
                retry_after_secs: 3,
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| SearchError::ApiError {
            status: 0,
            message: e.to_string(),
        })?;
        let mut records = parse_feed(&body, self.config.abstract_chars).map_err(|message| {
            SearchError::ApiError {
                status: 0,
                message: format!("Atom parse error: {}", message),
            }
        })?;

        let now = Utc::now();
        records.retain(|r| self.within_age(r, now));
        sort_newest_first(&mut records);
        records.truncate(max_results);

        debug!("arXiv returned {} papers for '{}'", records.len(), query);
        Ok(records)
    }

    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn is_available(&self) -> bool {
        self.config.enabled
    }
}

/// Newest submission first; unparsable dates sort last
pub fn sort_newest_first(records: &mut [LiteratureRecord]) {
    records.sort_by_key(|r| {
        std::cmp::Reverse(
            DateTime::parse_from_rfc3339(&r.published)
                .map(|d| d.with_timezone(&Utc))
                .ok(),
        )
    });
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    author_name: String,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn finish(self, abstract_chars: usize) -> LiteratureRecord {
        LiteratureRecord {
            id: self.id.trim().to_string(),
            title: collapse_whitespace(&self.title),
            published: self.published.trim().to_string(),
            authors: self.authors,
            summary: truncate_chars(&collapse_whitespace(&self.summary), abstract_chars),
            pdf_url: self.pdf_url,
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse an Atom feed into literature records, in feed order
pub fn parse_feed(xml: &str, abstract_chars: usize) -> Result<Vec<LiteratureRecord>, String> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                if name == "entry" {
                    entry = Some(EntryBuilder::default());
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if local_name(e.local_name().as_ref()) != "link" {
                    continue;
                }
                let Some(current) = entry.as_mut() else {
                    continue;
                };
                let mut href = None;
                let mut is_pdf = false;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| e.to_string())?;
                    let value = attr.unescape_value().map_err(|e| e.to_string())?;
                    match attr.key.local_name().as_ref() {
                        b"href" => href = Some(value.into_owned()),
                        b"title" => is_pdf = value == "pdf",
                        _ => {}
                    }
                }
                if is_pdf {
                    current.pdf_url = href;
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                append_text(entry.as_mut(), &path, &text);
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                append_text(entry.as_mut(), &path, &text);
            }
            Event::End(e) => {
                let name = local_name(e.local_name().as_ref());
                path.pop();
                match name.as_str() {
                    "entry" => {
                        if let Some(done) = entry.take() {
                            records.push(done.finish(abstract_chars));
                        }
                    }
                    "author" => {
                        if let Some(current) = entry.as_mut() {
                            let author = collapse_whitespace(&current.author_name);
                            if !author.is_empty() {
                                current.authors.push(author);
                            }
                            current.author_name.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

fn append_text(entry: Option<&mut EntryBuilder>, path: &[String], text: &str) {
    let Some(entry) = entry else {
        return;
    };
    let (Some(leaf), Some(parent)) = (path.last(), path.len().checked_sub(2).map(|i| &path[i])) else {
        return;
    };

    let target = match (parent.as_str(), leaf.as_str()) {
        ("entry", "id") => &mut entry.id,
        ("entry", "title") => &mut entry.title,
        ("entry", "summary") => &mut entry.summary,
        ("entry", "published") => &mut entry.published,
        ("author", "name") => &mut entry.author_name,
        _ => return,
    };
    target.push_str(text);
}
