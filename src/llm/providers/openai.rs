// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible chat completions provider implementation
//!
//! Implements the ModelProvider trait for GPT-family models and any
//! OpenAI-compatible endpoint.

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

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Convert conversation messages to OpenAI wire format
    fn convert_messages(&self, messages: &[Message], system: Option<&str>) -> Vec<OpenAiMessage> {
        let mut result = Vec::new();

        if let Some(sys) = system {
            result.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(sys.to_string()),
                tool_call_id: None,
            });
        }

        for m in messages {
            let (role, tool_call_id) = match m.role {
                Role::User => ("user", None),
                Role::Assistant => ("assistant", None),
                Role::Tool => ("tool", m.tool_use_id.clone()),
            };
            result.push(OpenAiMessage {
                role: role.to_string(),
                content: Some(m.text.clone()),
                tool_call_id,
            });
        }

        result
    }

    /// Convert tool definitions to OpenAI function declarations
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: serde_json::json!({
                        "type": t.input_schema.schema_type,
                        "properties": t.input_schema.properties,
                        "required": t.input_schema.required,
                    }),
                },
            })
            .collect()
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest, stream: bool) -> OpenAiRequest {
        OpenAiRequest {
            model: request.model.clone(),
            messages: self.convert_messages(&request.messages, request.system.as_deref()),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(self.convert_tools(&request.tools))
            },
            stream,
        }
    }

    /// Parse an error response body into the API error taxonomy
    fn parse_error(&self, status: u16, body: &str) -> AtelierError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiError>(body) {
            match status {
                401 => AtelierError::Api(ApiError::AuthenticationFailed),
                429 => AtelierError::Api(ApiError::RateLimited(10)),
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
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request, false);

        let response = self
            .client
            .post(&self.base_url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body));
        }

        let api_response: OpenAiResponse = response.json().await?;
        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            AtelierError::Api(ApiError::InvalidResponse("response had no choices".into()))
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolUseRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or_else(|_| serde_json::json!({})),
            })
            .collect();

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason: choice.finish_reason.as_deref().map(parse_finish_reason),
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let body = self.build_request(&request, true);

        let response = self
            .client
            .post(&self.base_url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body));
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

                // One `data: <json>` line per event; [DONE] terminates
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    *buffer = buffer[pos + 1..].to_string();

                    if let Some(payload) = line.strip_prefix("data: ") {
                        if payload == "[DONE]" {
                            events.push(Ok(StreamEvent::MessageStop));
                        } else {
                            events.extend(parse_chunk(payload).into_iter().map(Ok));
                        }
                    }
                }

                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

fn parse_finish_reason(raw: &str) -> StopReason {
    match raw {
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        _ => StopReason::EndTurn,
    }
}

/// Parse one streamed chunk payload into stream events
fn parse_chunk(payload: &str) -> Vec<StreamEvent> {
    let parsed: OpenAiStreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(_) => return vec![],
    };

    let mut events = Vec::new();

    for choice in parsed.choices {
        if let Some(delta) = choice.delta {
            if let Some(content) = delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::TextDelta { text: content });
                }
            }
            for tc in delta.tool_calls.unwrap_or_default() {
                if let (Some(id), Some(name)) =
                    (tc.id.clone(), tc.function.as_ref().and_then(|f| f.name.clone()))
                {
                    events.push(StreamEvent::ToolUseStart {
                        index: tc.index,
                        id,
                        name,
                    });
                }
                if let Some(args) = tc.function.and_then(|f| f.arguments) {
                    if !args.is_empty() {
                        events.push(StreamEvent::ToolInputDelta {
                            index: tc.index,
                            partial_json: args,
                        });
                    }
                }
            }
        }
        if let Some(reason) = choice.finish_reason {
            events.push(StreamEvent::MessageDelta {
                stop_reason: Some(parse_finish_reason(&reason)),
            });
        }
    }

    events
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    id: String,
    model: String,
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: Option<OpenAiDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDeltaToolCall {
    index: usize,
    id: Option<String>,
    function: Option<OpenAiDeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDeltaFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Message;

    #[test]
    fn test_provider_new() {
        let provider = OpenAiProvider::new("test-key");
        assert_eq!(provider.base_url, OPENAI_API_URL);
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_convert_messages_with_system() {
        let provider = OpenAiProvider::new("test-key");
        let messages = vec![Message::user("Hello")];

        let converted = provider.convert_messages(&messages, Some("Be helpful"));

        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
    }

    #[test]
    fn test_convert_tool_message() {
        let provider = OpenAiProvider::new("test-key");
        let messages = vec![Message::tool("call_1", "result text")];

        let converted = provider.convert_messages(&messages, None);

        assert_eq!(converted[0].role, "tool");
        assert_eq!(converted[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_build_request_stream_flag() {
        let provider = OpenAiProvider::new("test-key");
        let request = CompletionRequest::new("gpt-4o", vec![Message::user("Hi")]);

        let built = provider.build_request(&request, true);
        assert!(built.stream);
        assert_eq!(built.model, "gpt-4o");
    }

    #[test]
    fn test_parse_error_authentication() {
        let provider = OpenAiProvider::new("test-key");
        let body = r#"{"error": {"message": "Incorrect API key"}}"#;

        match provider.parse_error(401, body) {
            AtelierError::Api(ApiError::AuthenticationFailed) => {}
            _ => panic!("Expected AuthenticationFailed"),
        }
    }

    #[test]
    fn test_parse_error_rate_limit() {
        let provider = OpenAiProvider::new("test-key");
        let body = r#"{"error": {"message": "Rate limit reached"}}"#;

        match provider.parse_error(429, body) {
            AtelierError::Api(ApiError::RateLimited(_)) => {}
            _ => panic!("Expected RateLimited"),
        }
    }

    #[test]
    fn test_parse_chunk_text_delta() {
        let payload = r#"{"choices": [{"delta": {"content": "Hello"}, "finish_reason": null}]}"#;

        let events = parse_chunk(payload);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::TextDelta { text } => assert_eq!(text, "Hello"),
            _ => panic!("Expected TextDelta"),
        }
    }

    #[test]
    fn test_parse_chunk_tool_call_start() {
        let payload = r#"{"choices": [{"delta": {"tool_calls": [{"index": 0, "id": "call_1", "function": {"name": "web_search", "arguments": ""}}]}, "finish_reason": null}]}"#;

        let events = parse_chunk(payload);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::ToolUseStart { id, name, .. } => {
                assert_eq!(id, "call_1");
                assert_eq!(name, "web_search");
            }
            _ => panic!("Expected ToolUseStart"),
        }
    }

    #[test]
    fn test_parse_chunk_tool_call_arguments() {
        let payload = r#"{"choices": [{"delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"query\":"}}]}, "finish_reason": null}]}"#;

        let events = parse_chunk(payload);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::ToolInputDelta { partial_json, .. } => {
                assert_eq!(partial_json, "{\"query\":");
            }
            _ => panic!("Expected ToolInputDelta"),
        }
    }

    #[test]
    fn test_parse_chunk_finish_reason() {
        let payload = r#"{"choices": [{"delta": {}, "finish_reason": "tool_calls"}]}"#;

        let events = parse_chunk(payload);

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::MessageDelta { stop_reason } => {
                assert_eq!(*stop_reason, Some(StopReason::ToolUse));
            }
            _ => panic!("Expected MessageDelta"),
        }
    }

    #[test]
    fn test_parse_chunk_invalid_json() {
        assert!(parse_chunk("{not json").is_empty());
    }

    #[test]
    fn test_parse_finish_reason() {
        assert_eq!(parse_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(parse_finish_reason("length"), StopReason::MaxTokens);
        assert_eq!(parse_finish_reason("tool_calls"), StopReason::ToolUse);
    }
}
