// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool schema construction
//!
//! Helper for building JSON Schema argument definitions.

use serde_json::Value;

use crate::llm::provider::ToolInputSchema;

/// Helper to create a tool input schema
pub struct SchemaBuilder {
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            properties: serde_json::Map::new(),
            required: vec![],
        }
    }

    /// Add a string property
    pub fn string(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": "string",
                "description": description
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add an integer property
    pub fn integer(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": "integer",
                "description": description
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a boolean property
    pub fn boolean(mut self, name: &str, description: &str, required: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            serde_json::json!({
                "type": "boolean",
                "description": description
            }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Build the schema
    pub fn build(self) -> ToolInputSchema {
        ToolInputSchema {
            schema_type: "object".to_string(),
            properties: Value::Object(self.properties),
            required: self.required,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder_empty() {
        let schema = SchemaBuilder::new().build();
        assert_eq!(schema.schema_type, "object");
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_schema_builder_string() {
        let schema = SchemaBuilder::new()
            .string("query", "The search query", true)
            .build();

        assert_eq!(schema.properties["query"]["type"], "string");
        assert_eq!(schema.properties["query"]["description"], "The search query");
        assert_eq!(schema.required, vec!["query"]);
    }

    #[test]
    fn test_schema_builder_optional_property() {
        let schema = SchemaBuilder::new()
            .integer("limit", "Result limit", false)
            .build();

        assert_eq!(schema.properties["limit"]["type"], "integer");
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_schema_builder_mixed() {
        let schema = SchemaBuilder::new()
            .string("query", "The query", true)
            .integer("limit", "Limit", false)
            .boolean("fresh", "Skip cache", false)
            .build();

        assert_eq!(schema.properties.as_object().unwrap().len(), 3);
        assert_eq!(schema.required, vec!["query"]);
    }
}
