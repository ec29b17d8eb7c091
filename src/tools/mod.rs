// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool system
//!
//! Tools are read-only external lookups the model can request mid-stream.
//! Each tool exposes a name, a JSON argument schema, and an async invoke.

pub mod definition;
pub mod web_search;

pub use definition::SchemaBuilder;
pub use web_search::WebSearchTool;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::llm::provider::{ToolDefinition, ToolInputSchema};

/// A tool invocable by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name as exposed to the model
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON schema for the tool's arguments
    fn input_schema(&self) -> ToolInputSchema;

    /// Execute the tool
    async fn invoke(&self, arguments: Value) -> Result<String>;

    /// Definition handed to the model provider
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of invocable tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Definitions for all registered tools
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry has no tools
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AtelierError;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn input_schema(&self) -> ToolInputSchema {
            SchemaBuilder::new()
                .string("text", "Text to echo", true)
                .build()
        }

        async fn invoke(&self, arguments: Value) -> Result<String> {
            arguments["text"]
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| AtelierError::InvalidInput("missing text".into()))
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "echo");
        assert_eq!(definitions[0].input_schema.required, vec!["text"]);
    }

    #[tokio::test]
    async fn test_tool_invoke() {
        let tool = EchoTool;
        let result = tool
            .invoke(serde_json::json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn test_tool_invoke_error() {
        let tool = EchoTool;
        let result = tool.invoke(serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_definition() {
        let definition = EchoTool.definition();
        assert_eq!(definition.name, "echo");
        assert_eq!(definition.description, "Echo the input back");
    }
}
