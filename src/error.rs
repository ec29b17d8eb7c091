// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Atelier
//!
//! This module defines all error types used throughout the pipeline.

use thiserror::Error;

/// Main error type for Atelier operations
#[derive(Error, Debug)]
pub enum AtelierError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Tool invocation errors
    #[error("Tool invocation failed: {0}")]
    ToolInvocation(String),

    /// The tool loop exceeded its iteration bound
    #[error("Tool loop exceeded maximum of {max_iterations} iterations")]
    ToolLoopExceeded { max_iterations: usize },

    /// The auto-fix chain exceeded its retry ceiling
    #[error("Fix limit exceeded after {attempts} attempts")]
    FixLimitExceeded { attempts: u32 },

    /// The response contained no usable CODE section
    #[error("No CODE section found in the model response")]
    NoCodeSection,

    /// Session errors
    #[error("Session error: {0}")]
    Session(String),

    /// Sandbox collaborator errors
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for Atelier operations
pub type Result<T> = std::result::Result<T, AtelierError>;

impl From<toml::de::Error> for AtelierError {
    fn from(err: toml::de::Error) -> Self {
        AtelierError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for AtelierError {
    fn from(err: toml::ser::Error) -> Self {
        AtelierError::Toml(err.to_string())
    }
}

impl From<anyhow::Error> for AtelierError {
    fn from(err: anyhow::Error) -> Self {
        AtelierError::Sandbox(err.to_string())
    }
}
