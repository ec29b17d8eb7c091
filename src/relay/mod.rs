// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Stream relay
//!
//! Bridges the upstream model token stream to a normalized downstream event
//! stream. Each text delta is forwarded immediately; tool-call turns are
//! handed to the orchestrator without closing the downstream stream; the
//! stream terminates exactly once, with `Done` or a single `Error` event.

pub mod sse;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::llm::message::Message;
use crate::llm::provider::{ModelProvider, StopReason, StreamEvent, ToolUseRequest};
use crate::llm::registry::GenerationProfile;
use crate::orchestrator::{OrchestratorConfig, ToolOrchestrator};
use crate::prompt;
use crate::tools::ToolRegistry;

/// Capacity of the downstream event channel
const CHANNEL_CAPACITY: usize = 64;

/// Normalized downstream event
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A text delta from the model
    Chunk { content: String },
    /// Terminal error; no further events follow
    Error { message: String },
    /// Terminal success; no further events follow
    Done,
}

/// Accumulates provider stream events into a full turn.
///
/// Text is gathered for the final message; tool-use blocks are assembled
/// from their argument deltas into complete requests.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    tool_calls: Vec<ToolUseRequest>,
    pending: Option<PendingTool>,
    stop_reason: Option<StopReason>,
}

#[derive(Debug)]
struct PendingTool {
    index: usize,
    id: String,
    name: String,
    input_json: String,
}

/// A fully accumulated model turn
#[derive(Debug)]
pub struct AccumulatedTurn {
    /// Full text of the turn
    pub text: String,
    /// Tool calls requested, in document order
    pub tool_calls: Vec<ToolUseRequest>,
    /// Stop reason, if the provider reported one
    pub stop_reason: Option<StopReason>,
}

impl StreamAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one provider event; returns the text delta to forward
    /// downstream, if any
    pub fn process(&mut self, event: StreamEvent) -> Option<String> {
        match event {
            StreamEvent::TextDelta { text } => {
                self.text.push_str(&text);
                Some(text)
            }
            StreamEvent::ToolUseStart { index, id, name } => {
                self.flush_pending();
                self.pending = Some(PendingTool {
                    index,
                    id,
                    name,
                    input_json: String::new(),
                });
                None
            }
            StreamEvent::ToolInputDelta {
                index,
                partial_json,
            } => {
                if let Some(pending) = self.pending.as_mut() {
                    if pending.index == index {
                        pending.input_json.push_str(&partial_json);
                    }
                }
                None
            }
            StreamEvent::BlockStop { index } => {
                if self.pending.as_ref().is_some_and(|p| p.index == index) {
                    self.flush_pending();
                }
                None
            }
            StreamEvent::MessageDelta { stop_reason } => {
                if stop_reason.is_some() {
                    self.stop_reason = stop_reason;
                }
                None
            }
            StreamEvent::MessageStart { .. }
            | StreamEvent::MessageStop
            | StreamEvent::Ping
            | StreamEvent::Error { .. } => None,
        }
    }

    /// Consume the accumulator and return the finished turn
    pub fn finish(mut self) -> AccumulatedTurn {
        self.flush_pending();
        AccumulatedTurn {
            text: self.text,
            tool_calls: self.tool_calls,
            stop_reason: self.stop_reason,
        }
    }

    fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            let arguments = if pending.input_json.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&pending.input_json)
                    .unwrap_or_else(|_| serde_json::json!({}))
            };
            self.tool_calls.push(ToolUseRequest {
                id: pending.id,
                name: pending.name,
                arguments,
            });
        }
    }
}

/// Server-side relay from a model provider to downstream consumers
pub struct StreamRelay {
    orchestrator: Arc<ToolOrchestrator>,
}

impl StreamRelay {
    /// Create a relay over a provider and tool set
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            orchestrator: Arc::new(ToolOrchestrator::new(provider, tools, config)),
        }
    }

    /// Open a generation stream.
    ///
    /// Returns the downstream event receiver. Dropping the receiver cancels
    /// the generation; the upstream reader is released when the relay task
    /// notices the closed channel.
    pub fn open(
        &self,
        messages: Vec<Message>,
        profile: GenerationProfile,
        system: Option<String>,
    ) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            let mut messages = messages;
            match orchestrator
                .run(&mut messages, &profile, system.as_deref(), Some(&tx))
                .await
            {
                Ok(result) => {
                    if !result.cancelled {
                        let _ = tx.send(RelayEvent::Done).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "generation stream failed");
                    let _ = tx
                        .send(RelayEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        });

        rx
    }

    /// Open a generation stream as a `Stream` of relay events.
    ///
    /// Wrapper over [`StreamRelay::open`] for consumers that compose with
    /// stream combinators; dropping the stream cancels the generation.
    pub fn open_stream(
        &self,
        messages: Vec<Message>,
        profile: GenerationProfile,
        system: Option<String>,
    ) -> tokio_stream::wrappers::ReceiverStream<RelayEvent> {
        tokio_stream::wrappers::ReceiverStream::new(self.open(messages, profile, system))
    }

    /// Run a generation to completion in-process and return the final turn
    /// text with the updated message history. Used for server-side auto-fix
    /// where no downstream consumer is attached.
    pub async fn generate(
        &self,
        mut messages: Vec<Message>,
        profile: GenerationProfile,
        system: Option<String>,
    ) -> Result<(String, Vec<Message>)> {
        let result = self
            .orchestrator
            .run(&mut messages, &profile, system.as_deref(), None)
            .await?;
        Ok((result.text, messages))
    }

    /// One-shot filler content: drain a short stream into a single string.
    ///
    /// Reuses the generation pipeline for the trivial non-streamed case
    /// (incidental content shown while the main generation is in flight).
    pub async fn fill_in(&self, topic: &str, profile: GenerationProfile) -> Result<String> {
        let messages = vec![Message::user(format!("<topic>{topic}</topic>"))];
        let (text, _) = self
            .generate(messages, profile, Some(prompt::FUN_FACT_PROMPT.to_string()))
            .await?;
        Ok(text)
    }

    /// One-shot title suggestion for a project prompt
    pub async fn suggest_title(&self, prompt_text: &str, profile: GenerationProfile) -> Result<String> {
        let messages = vec![Message::user(prompt_text.to_string())];
        let (text, _) = self
            .generate(messages, profile, Some(prompt::TITLE_PROMPT.to_string()))
            .await?;
        Ok(text.trim().to_string())
    }
}
