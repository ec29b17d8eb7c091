// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Atelier - AI-assisted UI component generation pipeline.
//!
//! Users describe a component in natural language; a model streams back a
//! tagged document (analysis, extra libraries, code, verification); the
//! code is compiled in a sandboxed preview runtime whose errors feed a
//! bounded auto-fix loop.
//!
//! Architecture highlights:
//! - `document`: incremental tagged-section parser and library declarations
//! - `relay`: model stream to downstream event stream, SSE envelope
//! - `orchestrator`: bounded multi-turn tool-invocation loop
//! - `controller`: compile-feedback state machine and version navigation
//! - `session`: message history, streaming buffer, retained versions
//! - `llm`: provider abstraction, capability table and implementations
//! - `sandbox`: collaborator interface to the preview runtime

pub mod cli;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod relay;
pub mod sandbox;
pub mod session;
pub mod tools;

pub use error::{AtelierError, Result};
