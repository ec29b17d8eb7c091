// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model capability table
//!
//! Maps a requested model name to a provider configuration. Selection is a
//! prefix match over a declarative table; adding a model is adding a row,
//! not touching control flow. Unknown models fall back to the default row.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::{AtelierError, Result};
use crate::llm::provider::ModelProvider;
use crate::llm::providers::{AnthropicProvider, OpenAiProvider};

/// Which backend a table row routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic Messages API, direct
    Anthropic,
    /// Anthropic-compatible gateway in a fixed region
    Bedrock,
    /// OpenAI-compatible chat completions API
    OpenAi,
}

/// One row of the capability table
#[derive(Debug, Clone, Copy)]
pub struct ModelTableRow {
    /// Model-name prefix this row matches (e.g. "claude")
    pub prefix: &'static str,
    /// Backend kind
    pub kind: ProviderKind,
    /// Concrete model identifier sent upstream
    pub model_id: &'static str,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Region for gateway-backed rows
    pub region: Option<&'static str>,
}

/// The capability table, matched top to bottom
pub const MODEL_TABLE: &[ModelTableRow] = &[
    ModelTableRow {
        prefix: "bedrock",
        kind: ProviderKind::Bedrock,
        model_id: "anthropic.claude-3-5-sonnet-20240620-v1:0",
        temperature: 0.2,
        max_tokens: 8192,
        region: Some("us-east-1"),
    },
    ModelTableRow {
        prefix: "anthropic",
        kind: ProviderKind::Bedrock,
        model_id: "anthropic.claude-3-5-sonnet-20240620-v1:0",
        temperature: 0.2,
        max_tokens: 8192,
        region: Some("us-east-1"),
    },
    ModelTableRow {
        prefix: "claude",
        kind: ProviderKind::Anthropic,
        model_id: "claude-3-5-sonnet-20240620",
        temperature: 0.0,
        max_tokens: 8192,
        region: None,
    },
    ModelTableRow {
        prefix: "gpt",
        kind: ProviderKind::OpenAi,
        model_id: "gpt-4o",
        temperature: 0.2,
        max_tokens: 8192,
        region: None,
    },
];

/// Fallback row for unknown or unspecified models
pub const DEFAULT_ROW: ModelTableRow = ModelTableRow {
    prefix: "",
    kind: ProviderKind::Bedrock,
    model_id: "anthropic.claude-3-5-sonnet-20240620-v1:0",
    temperature: 0.2,
    max_tokens: 8192,
    region: Some("us-east-1"),
};

/// Generation parameters resolved from the table for one request
#[derive(Debug, Clone)]
pub struct GenerationProfile {
    /// Concrete model identifier sent upstream
    pub model_id: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
}

impl From<&ModelTableRow> for GenerationProfile {
    fn from(row: &ModelTableRow) -> Self {
        Self {
            model_id: row.model_id.to_string(),
            temperature: row.temperature,
            max_tokens: row.max_tokens,
        }
    }
}

/// Resolve a requested model name to its table row
pub fn resolve(model: &str) -> &'static ModelTableRow {
    MODEL_TABLE
        .iter()
        .find(|row| model.starts_with(row.prefix))
        .unwrap_or(&DEFAULT_ROW)
}

/// Construct the provider for a table row using credentials from settings
pub fn provider_for(row: &ModelTableRow, settings: &Settings) -> Result<Arc<dyn ModelProvider>> {
    match row.kind {
        ProviderKind::Anthropic => {
            let api_key = settings.anthropic_api_key().ok_or_else(|| {
                AtelierError::Config(
                    "No Anthropic API key found. Set ANTHROPIC_API_KEY or edit the config file."
                        .to_string(),
                )
            })?;

            let provider = if let Some(ref base_url) = settings.providers.anthropic.base_url {
                AnthropicProvider::with_base_url(api_key, base_url)
            } else {
                AnthropicProvider::new(api_key)
            };
            Ok(Arc::new(provider))
        }
        ProviderKind::Bedrock => {
            // The gateway speaks the Anthropic Messages API in a fixed region
            let api_key = settings.bedrock_api_key().ok_or_else(|| {
                AtelierError::Config(
                    "No Bedrock gateway key found. Set BEDROCK_API_KEY or edit the config file."
                        .to_string(),
                )
            })?;
            let region = row.region.unwrap_or("us-east-1");
            let base_url = settings.bedrock_gateway_url(region);
            Ok(Arc::new(AnthropicProvider::with_base_url(api_key, base_url)))
        }
        ProviderKind::OpenAi => {
            let api_key = settings.openai_api_key().ok_or_else(|| {
                AtelierError::Config(
                    "No OpenAI API key found. Set OPENAI_API_KEY or edit the config file."
                        .to_string(),
                )
            })?;

            let provider = if let Some(ref base_url) = settings.providers.openai.base_url {
                OpenAiProvider::with_base_url(api_key, base_url)
            } else {
                OpenAiProvider::new(api_key)
            };
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bedrock_prefix() {
        let row = resolve("bedrock-claude-3-5-sonnet");
        assert_eq!(row.kind, ProviderKind::Bedrock);
        assert_eq!(row.region, Some("us-east-1"));
        assert!((row.temperature - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_resolve_anthropic_prefix_routes_to_gateway() {
        let row = resolve("anthropic.claude-3-5-sonnet-20240620-v1:0");
        assert_eq!(row.kind, ProviderKind::Bedrock);
    }

    #[test]
    fn test_resolve_claude_prefix() {
        let row = resolve("claude-3-5-sonnet-20240620");
        assert_eq!(row.kind, ProviderKind::Anthropic);
        assert_eq!(row.model_id, "claude-3-5-sonnet-20240620");
        assert!((row.temperature - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_resolve_gpt_prefix() {
        let row = resolve("gpt-4o-mini");
        assert_eq!(row.kind, ProviderKind::OpenAi);
        assert_eq!(row.model_id, "gpt-4o");
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        let row = resolve("mistral-large");
        assert_eq!(row.kind, DEFAULT_ROW.kind);
        assert_eq!(row.model_id, DEFAULT_ROW.model_id);
    }

    #[test]
    fn test_resolve_empty_falls_back() {
        // Every prefix fails on the empty string, so the default row applies
        let row = resolve("");
        assert_eq!(row.model_id, DEFAULT_ROW.model_id);
    }

    #[test]
    fn test_all_rows_have_max_tokens() {
        for row in MODEL_TABLE {
            assert_eq!(row.max_tokens, 8192);
        }
    }

    #[test]
    fn test_profile_from_row() {
        let profile = GenerationProfile::from(resolve("claude-3-5-sonnet-20240620"));
        assert_eq!(profile.model_id, "claude-3-5-sonnet-20240620");
        assert_eq!(profile.max_tokens, 8192);
    }

    #[test]
    fn test_provider_for_anthropic_no_key() {
        let mut settings = Settings::default();
        settings.providers.anthropic.api_key = None;
        settings.providers.anthropic.api_key_env = "NONEXISTENT_ENV_VAR_12345".to_string();

        let result = provider_for(resolve("claude-3-5-sonnet-20240620"), &settings);
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_for_openai_no_key() {
        let mut settings = Settings::default();
        settings.providers.openai.api_key = None;
        settings.providers.openai.api_key_env = "NONEXISTENT_ENV_VAR_12345".to_string();

        let result = provider_for(resolve("gpt-4o"), &settings);
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_for_anthropic_with_key() {
        let mut settings = Settings::default();
        settings.providers.anthropic.api_key = Some("test-key".to_string());

        let provider = provider_for(resolve("claude-3-5-sonnet-20240620"), &settings).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
