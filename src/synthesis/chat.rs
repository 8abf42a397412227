// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible chat completion synthesizer (Groq by default)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{unavailable_passage, Synthesizer, EMPTY_COMPLETION};
use crate::config::SynthesisConfig;

const SYSTEM_PROMPT: &str = "You are an intelligent AI assistant that provides detailed, accurate, and helpful answers.
When given context information, analyze it carefully and synthesize an informative response that:
- Directly answers the user's question
- Provides relevant details and examples
- Organizes information clearly with sections if needed
- Cites specific sources when referencing information
- Maintains a professional but conversational tone

If no context is provided, use your general knowledge to give the best possible answer.";

pub struct ChatSynthesizer {
    client: Client,
    config: SynthesisConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

impl ChatSynthesizer {
    pub fn new(config: SynthesisConfig, timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn messages(query: &str, context: &str) -> Vec<ChatMessage> {
        let user = if context.trim().is_empty() {
            query.to_string()
        } else {
            format!(
                "Here is some relevant information:\n\n{}\n\nBased on this context, please answer: {}",
                context, query
            )
        };

        vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user,
            },
        ]
    }

    async fn complete(&self, api_key: &str, query: &str, context: &str) -> Result<String, String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: Self::messages(query, context),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Error while summarizing via {}: {}", self.config.provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(500).collect();
            warn!("{} HTTP error {}: {}", self.config.provider, status.as_u16(), body);
            return Err(format!(
                "{} API error {}: {}",
                self.config.provider,
                status.as_u16(),
                body
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("Error while summarizing via {}: {}", self.config.provider, e))?;

        Ok(extract_content(parsed))
    }
}

fn extract_content(response: ChatResponse) -> String {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .map(|m| m.content.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        EMPTY_COMPLETION.to_string()
    } else {
        content
    }
}

#[async_trait]
impl Synthesizer for ChatSynthesizer {
    fn provider(&self) -> &str {
        &self.config.provider
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn synthesize(&self, query: &str, context: &str) -> String {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return unavailable_passage(
                &self.config.provider,
                &format!("{}_API_KEY is not set", self.config.provider.to_uppercase()),
                context,
            );
        };

        match self.complete(api_key, query, context).await {
            Ok(text) => {
                debug!("{} summary generated ({} chars)", self.config.provider, text.len());
                text
            }
            Err(annotated) => annotated,
        }
    }
}
