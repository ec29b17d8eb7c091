// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Application settings
//!
//! Settings are loaded from `~/.atelier/config.toml` with environment
//! variable fallback for credentials. Every field has a serde default so a
//! partial file always loads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Model provider configurations
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Defaults for new generation sessions
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Pipeline limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Search tool configuration
    #[serde(default)]
    pub search: SearchConfig,
}

/// Configuration for model providers
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub bedrock: BedrockConfig,
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,

    /// Base URL for API (for custom endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_anthropic_api_key_env(),
            base_url: None,
        }
    }
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Base URL for API (for custom endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_openai_api_key_env(),
            base_url: None,
        }
    }
}

/// Bedrock gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockConfig {
    /// Gateway key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for the gateway key
    #[serde(default = "default_bedrock_api_key_env")]
    pub api_key_env: String,

    /// Gateway URL template; `{region}` is substituted
    #[serde(default = "default_bedrock_gateway_url")]
    pub gateway_url: String,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_bedrock_api_key_env(),
            gateway_url: default_bedrock_gateway_url(),
        }
    }
}

/// Defaults for new generation sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default model selector (matched against the capability table)
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

/// Pipeline limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum tool-loop iterations per generation
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Maximum auto-fix attempts per session
    #[serde(default = "default_max_fix_attempts")]
    pub max_fix_attempts: u32,

    /// Overall stream timeout in seconds
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            max_fix_attempts: default_max_fix_attempts(),
            stream_timeout_secs: default_stream_timeout_secs(),
        }
    }
}

/// Search tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Environment variable name for the search API key
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,

    /// Search endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_api_key_env(),
            base_url: None,
        }
    }
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_bedrock_api_key_env() -> String {
    "BEDROCK_API_KEY".to_string()
}

fn default_search_api_key_env() -> String {
    "PERPLEXITY_API_KEY".to_string()
}

fn default_bedrock_gateway_url() -> String {
    "https://bedrock-runtime.{region}.amazonaws.com/anthropic/v1/messages".to_string()
}

fn default_model() -> String {
    "bedrock-claude-3-5-sonnet".to_string()
}

fn default_max_tool_iterations() -> usize {
    5
}

fn default_max_fix_attempts() -> u32 {
    3
}

fn default_stream_timeout_secs() -> u64 {
    300
}

impl Settings {
    /// Path to the configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".atelier")
    }

    /// Path to the configuration file
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load settings from the default path, or defaults if the file does
    /// not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Anthropic API key from settings or environment
    pub fn anthropic_api_key(&self) -> Option<String> {
        self.providers
            .anthropic
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.providers.anthropic.api_key_env).ok())
    }

    /// OpenAI API key from settings or environment
    pub fn openai_api_key(&self) -> Option<String> {
        self.providers
            .openai
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.providers.openai.api_key_env).ok())
    }

    /// Bedrock gateway key from settings or environment
    pub fn bedrock_api_key(&self) -> Option<String> {
        self.providers
            .bedrock
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.providers.bedrock.api_key_env).ok())
    }

    /// Search API key from the environment
    pub fn search_api_key(&self) -> Option<String> {
        std::env::var(&self.search.api_key_env).ok()
    }

    /// Gateway URL for a region
    pub fn bedrock_gateway_url(&self, region: &str) -> String {
        self.providers
            .bedrock
            .gateway_url
            .replace("{region}", region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.model, "bedrock-claude-3-5-sonnet");
        assert_eq!(settings.pipeline.max_tool_iterations, 5);
        assert_eq!(settings.pipeline.max_fix_attempts, 3);
        assert_eq!(settings.pipeline.stream_timeout_secs, 300);
    }

    #[test]
    fn test_settings_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [pipeline]
            max_tool_iterations = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.pipeline.max_tool_iterations, 3);
        // Unspecified fields fall back to defaults
        assert_eq!(settings.pipeline.max_fix_attempts, 3);
        assert_eq!(
            settings.providers.anthropic.api_key_env,
            "ANTHROPIC_API_KEY"
        );
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = Settings::default();
        settings.defaults.model = "claude-3-5-sonnet-20240620".to_string();

        let serialized = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.defaults.model, "claude-3-5-sonnet-20240620");
    }

    #[test]
    fn test_bedrock_gateway_url_substitution() {
        let settings = Settings::default();
        let url = settings.bedrock_gateway_url("us-east-1");
        assert!(url.contains("us-east-1"));
        assert!(!url.contains("{region}"));
    }

    #[test]
    fn test_api_key_direct_wins_over_env() {
        let mut settings = Settings::default();
        settings.providers.anthropic.api_key = Some("direct-key".to_string());
        assert_eq!(settings.anthropic_api_key().as_deref(), Some("direct-key"));
    }

    #[test]
    fn test_api_key_missing() {
        let mut settings = Settings::default();
        settings.providers.anthropic.api_key = None;
        settings.providers.anthropic.api_key_env = "NONEXISTENT_ENV_VAR_12345".to_string();
        assert!(settings.anthropic_api_key().is_none());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let settings =
            Settings::load_from(std::path::Path::new("/nonexistent/atelier/config.toml")).unwrap();
        assert_eq!(settings.pipeline.max_tool_iterations, 5);
    }
}
