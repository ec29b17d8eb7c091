// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Anthropic Messages API provider implementation
//!
//! Implements the ModelProvider trait for Claude models, both direct and
//! through Anthropic-compatible gateways.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, AtelierError, Result};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, EventStream, ModelProvider, StopReason, StreamEvent,
    ToolDefinition, ToolUseRequest,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL (gateways, test servers)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Convert conversation messages to Anthropic wire format.
    ///
    /// Tool result turns become `tool_result` content blocks under the user
    /// role, tied to the originating tool use ID.
    fn convert_messages(&self, messages: &[Message]) -> Vec<AnthropicMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::User => AnthropicMessage {
                    role: "user".to_string(),
                    content: AnthropicContent::Text(m.text.clone()),
                },
                Role::Assistant => AnthropicMessage {
                    role: "assistant".to_string(),
                    content: AnthropicContent::Text(m.text.clone()),
                },
                Role::Tool => AnthropicMessage {
                    role: "user".to_string(),
                    content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                        tool_use_id: m.tool_use_id.clone().unwrap_or_default(),
                        content: m.text.clone(),
                    }]),
                },
            })
            .collect()
    }

    /// Convert tool definitions to Anthropic format
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: serde_json::json!({
                    "type": t.input_schema.schema_type,
                    "properties": t.input_schema.properties,
                    "required": t.input_schema.required,
                }),
            })
            .collect()
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        AnthropicRequest {
            model: request.model.clone(),
            messages: self.convert_messages(&request.messages),
            system: request.system.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(self.convert_tools(&request.tools))
            },
            stream: Some(false),
        }
    }

    /// Extract Retry-After header value from HTTP response headers.
    ///
    /// Only the numeric-seconds form is parsed; the HTTP-date form is ignored.
    fn extract_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
        headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    }

    /// Parse an error response body into the API error taxonomy
    fn parse_error(&self, status: u16, body: &str, retry_after: Option<u64>) -> AtelierError {
        if let Ok(error_response) = serde_json::from_str::<AnthropicError>(body) {
            match error_response.error.error_type.as_str() {
                "authentication_error" => AtelierError::Api(ApiError::AuthenticationFailed),
                "rate_limit_error" => {
                    let retry_secs = retry_after.unwrap_or(10) as u32;
                    AtelierError::Api(ApiError::RateLimited(retry_secs))
                }
                "invalid_request_error" => {
                    AtelierError::Api(ApiError::InvalidResponse(error_response.error.message))
                }
                _ => AtelierError::Api(ApiError::ServerError {
                    status,
                    message: error_response.error.message,
                }),
            }
        } else {
            AtelierError::Api(ApiError::ServerError {
                status,
                message: body.to_string(),
            })
        }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let retry_after = Self::extract_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body, retry_after));
        }

        let api_response: AnthropicResponse = response.json().await?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in api_response.content {
            match block {
                AnthropicResponseBlock::Text { text: t } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&t);
                }
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolUseRequest {
                        id,
                        name,
                        arguments: input,
                    });
                }
            }
        }

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            text,
            tool_calls,
            stop_reason: api_response.stop_reason.as_deref().map(parse_stop_reason),
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let mut body = self.build_request(&request);
        body.stream = Some(true);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let retry_after = Self::extract_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body, retry_after));
        }

        let byte_stream = response.bytes_stream();

        let event_stream = byte_stream
            .map(|result| {
                result.map_err(|e| AtelierError::Api(ApiError::StreamError(e.to_string())))
            })
            .scan(String::new(), |buffer, result| {
                let chunk = match result {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
                    Err(e) => return futures::future::ready(Some(vec![Err(e)])),
                };

                buffer.push_str(&chunk);

                let mut events = Vec::new();

                // Parse SSE events from buffer
                while let Some(pos) = buffer.find("\n\n") {
                    let event_str = buffer[..pos].to_string();
                    *buffer = buffer[pos + 2..].to_string();

                    if let Some(event) = parse_sse_event(&event_str) {
                        events.push(Ok(event));
                    }
                }

                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

fn parse_stop_reason(raw: &str) -> StopReason {
    match raw {
        "max_tokens" => StopReason::MaxTokens,
        "tool_use" => StopReason::ToolUse,
        "stop_sequence" => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

/// Parse one Server-Sent Event into a stream event
fn parse_sse_event(event_str: &str) -> Option<StreamEvent> {
    let mut event_type = None;
    let mut data = None;

    for line in event_str.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            event_type = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data = Some(rest.to_string());
        }
    }

    let event_type = event_type?;
    let data = data?;

    match event_type.as_str() {
        "message_start" => {
            let parsed: serde_json::Value = serde_json::from_str(&data).ok()?;
            Some(StreamEvent::MessageStart {
                id: parsed["message"]["id"].as_str()?.to_string(),
                model: parsed["message"]["model"].as_str()?.to_string(),
            })
        }
        "content_block_start" => {
            let parsed: serde_json::Value = serde_json::from_str(&data).ok()?;
            let index = parsed["index"].as_u64()? as usize;
            let block = &parsed["content_block"];

            match block["type"].as_str()? {
                // Text blocks carry their content through deltas
                "text" => {
                    let text = block["text"].as_str().unwrap_or("");
                    if text.is_empty() {
                        None
                    } else {
                        Some(StreamEvent::TextDelta {
                            text: text.to_string(),
                        })
                    }
                }
                "tool_use" => Some(StreamEvent::ToolUseStart {
                    index,
                    id: block["id"].as_str()?.to_string(),
                    name: block["name"].as_str()?.to_string(),
                }),
                _ => None,
            }
        }
        "content_block_delta" => {
            let parsed: serde_json::Value = serde_json::from_str(&data).ok()?;
            let index = parsed["index"].as_u64()? as usize;
            let delta = &parsed["delta"];

            match delta["type"].as_str()? {
                "text_delta" => Some(StreamEvent::TextDelta {
                    text: delta["text"].as_str()?.to_string(),
                }),
                "input_json_delta" => Some(StreamEvent::ToolInputDelta {
                    index,
                    partial_json: delta["partial_json"].as_str()?.to_string(),
                }),
                _ => None,
            }
        }
        "content_block_stop" => {
            let parsed: serde_json::Value = serde_json::from_str(&data).ok()?;
            let index = parsed["index"].as_u64()? as usize;
            Some(StreamEvent::BlockStop { index })
        }
        "message_delta" => {
            let parsed: serde_json::Value = serde_json::from_str(&data).ok()?;
            let stop_reason = parsed["delta"]["stop_reason"]
                .as_str()
                .map(parse_stop_reason);
            Some(StreamEvent::MessageDelta { stop_reason })
        }
        "message_stop" => Some(StreamEvent::MessageStop),
        "ping" => Some(StreamEvent::Ping),
        "error" => {
            let parsed: serde_json::Value = serde_json::from_str(&data).ok()?;
            Some(StreamEvent::Error {
                error_type: parsed["error"]["type"].as_str()?.to_string(),
                message: parsed["error"]["message"].as_str()?.to_string(),
            })
        }
        _ => None,
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<AnthropicResponseBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
