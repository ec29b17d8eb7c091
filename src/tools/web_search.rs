// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Web search tool
//!
//! Read-only lookup against a Perplexity-style chat-completions search API.
//! The model invokes this when it is unsure how to build some functionality
//! or how to use a library.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{AtelierError, Result};
use crate::llm::provider::ToolInputSchema;
use crate::tools::{SchemaBuilder, Tool};

const DEFAULT_SEARCH_URL: &str = "https://api.perplexity.ai/chat/completions";
const DEFAULT_SEARCH_MODEL: &str = "llama-3.1-sonar-small-128k-online";

const SEARCH_SYSTEM_PROMPT: &str = "Your response must be thorough and detailed. Provide the most accurate and helpful information possible with code snippets where possible.";

/// Web search over an online-model chat completions API
pub struct WebSearchTool {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl WebSearchTool {
    /// Create a new search tool
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_SEARCH_URL.to_string(),
            model: DEFAULT_SEARCH_MODEL.to_string(),
        }
    }

    /// Create with a custom endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: DEFAULT_SEARCH_MODEL.to_string(),
        }
    }

    /// Override the search model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information about libraries, APIs and implementation techniques."
    }

    fn input_schema(&self) -> ToolInputSchema {
        SchemaBuilder::new()
            .string("query", "The search query to send.", true)
            .build()
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| AtelierError::InvalidInput("web_search requires a query".into()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SEARCH_SYSTEM_PROMPT },
                { "role": "user", "content": query }
            ]
        });

        let response = self
            .client
            .post(&self.base_url)
            .timeout(Duration::from_secs(60))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(AtelierError::ToolInvocation(format!(
                "search request failed with status {status}"
            )));
        }

        let payload: Value = response.json().await?;

        // Prefer the answer text; fall back to the raw payload
        let answer = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| payload.to_string());

        Ok(answer)
    }
}
