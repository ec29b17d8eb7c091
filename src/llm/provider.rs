// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model provider trait and related types
//!
//! Defines the abstraction layer for the upstream model backends.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;
use crate::llm::message::Message;

/// A pinned, boxed stream of provider events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Main trait for model providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider name (e.g., "anthropic", "openai")
    fn name(&self) -> &str;

    /// Non-streaming completion
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Streaming completion
    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream>;
}

/// Request for completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Concrete model identifier to send upstream
    pub model: String,

    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// System prompt
    pub system: Option<String>,

    /// Maximum tokens in response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Tools available for the model to use
    pub tools: Vec<ToolDefinition>,
}

/// Response from a non-streaming completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Response ID
    pub id: String,

    /// Model used
    pub model: String,

    /// Concatenated text content
    pub text: String,

    /// Tool calls requested by the model, in document order
    pub tool_calls: Vec<ToolUseRequest>,

    /// Stop reason
    pub stop_reason: Option<StopReason>,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUseRequest {
    /// Provider-assigned call ID
    pub id: String,

    /// Tool name
    pub name: String,

    /// Parsed JSON arguments
    pub arguments: serde_json::Value,
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of message
    EndTurn,
    /// Hit max tokens
    MaxTokens,
    /// Wants to use a tool
    ToolUse,
    /// Stop sequence hit
    StopSequence,
}

/// Events from a streaming response
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Start of message
    MessageStart { id: String, model: String },

    /// Incremental text content
    TextDelta { text: String },

    /// Start of a tool use block
    ToolUseStart { index: usize, id: String, name: String },

    /// Partial JSON for a tool use block's arguments
    ToolInputDelta { index: usize, partial_json: String },

    /// End of a content block
    BlockStop { index: usize },

    /// Message-level delta carrying the stop reason
    MessageDelta { stop_reason: Option<StopReason> },

    /// End of message
    MessageStop,

    /// Ping (keep-alive)
    Ping,

    /// Error surfaced inside the stream
    Error { error_type: String, message: String },
}

/// Tool definition for the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Input schema (JSON Schema)
    pub input_schema: ToolInputSchema,
}

/// Input schema for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Schema type (always "object")
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions
    pub properties: serde_json::Value,

    /// Required properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: 8192,
            temperature: 0.2,
            tools: vec![],
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Message;

    // ===== CompletionRequest Tests =====

    #[test]
    fn test_completion_request_new() {
        let messages = vec![Message::user("Hello")];
        let request = CompletionRequest::new("claude-3-5-sonnet-20240620", messages);

        assert_eq!(request.model, "claude-3-5-sonnet-20240620");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 8192);
        assert!((request.temperature - 0.2).abs() < 0.001);
        assert!(request.system.is_none());
        assert!(request.tools.is_empty());
    }

    #[test]
    fn test_completion_request_chained() {
        let messages = vec![Message::user("Hello")];
        let request = CompletionRequest::new("gpt-4o", messages)
            .with_system("System prompt")
            .with_max_tokens(2048)
            .with_temperature(0.9);

        assert_eq!(request.system, Some("System prompt".to_string()));
        assert_eq!(request.max_tokens, 2048);
        assert!((request.temperature - 0.9).abs() < 0.001);
    }

    #[test]
    fn test_completion_request_with_tools() {
        let tools = vec![ToolDefinition {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            input_schema: ToolInputSchema {
                schema_type: "object".to_string(),
                properties: serde_json::json!({}),
                required: vec![],
            },
        }];
        let messages = vec![Message::user("Hello")];
        let request = CompletionRequest::new("claude-3-5-sonnet-20240620", messages).with_tools(tools);

        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, "web_search");
    }

    // ===== StopReason Tests =====

    #[test]
    fn test_stop_reason_equality() {
        assert_eq!(StopReason::EndTurn, StopReason::EndTurn);
        assert_eq!(StopReason::ToolUse, StopReason::ToolUse);
        assert_ne!(StopReason::EndTurn, StopReason::ToolUse);
    }

    #[test]
    fn test_stop_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&StopReason::ToolUse).unwrap(),
            "\"tool_use\""
        );
        assert_eq!(
            serde_json::to_string(&StopReason::EndTurn).unwrap(),
            "\"end_turn\""
        );
    }

    // ===== ToolUseRequest Tests =====

    #[test]
    fn test_tool_use_request() {
        let request = ToolUseRequest {
            id: "tool_123".to_string(),
            name: "web_search".to_string(),
            arguments: serde_json::json!({"query": "recharts line chart"}),
        };

        assert_eq!(request.id, "tool_123");
        assert_eq!(request.arguments["query"], "recharts line chart");
    }

    // ===== ToolDefinition Tests =====

    #[test]
    fn test_tool_definition_creation() {
        let tool = ToolDefinition {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            input_schema: ToolInputSchema {
                schema_type: "object".to_string(),
                properties: serde_json::json!({
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                }),
                required: vec!["query".to_string()],
            },
        };

        assert_eq!(tool.name, "web_search");
        assert_eq!(tool.input_schema.schema_type, "object");
        assert_eq!(tool.input_schema.required.len(), 1);
    }

    // ===== StreamEvent Tests =====

    #[test]
    fn test_stream_event_text_delta() {
        let event = StreamEvent::TextDelta {
            text: "Hello".to_string(),
        };

        if let StreamEvent::TextDelta { text } = event {
            assert_eq!(text, "Hello");
        } else {
            panic!("Expected TextDelta variant");
        }
    }

    #[test]
    fn test_stream_event_tool_use_start() {
        let event = StreamEvent::ToolUseStart {
            index: 1,
            id: "tool_1".to_string(),
            name: "web_search".to_string(),
        };

        if let StreamEvent::ToolUseStart { index, id, name } = event {
            assert_eq!(index, 1);
            assert_eq!(id, "tool_1");
            assert_eq!(name, "web_search");
        } else {
            panic!("Expected ToolUseStart variant");
        }
    }

    #[test]
    fn test_stream_event_error() {
        let event = StreamEvent::Error {
            error_type: "rate_limit".to_string(),
            message: "Too many requests".to_string(),
        };

        if let StreamEvent::Error {
            error_type,
            message,
        } = event
        {
            assert_eq!(error_type, "rate_limit");
            assert_eq!(message, "Too many requests");
        } else {
            panic!("Expected Error variant");
        }
    }
}
