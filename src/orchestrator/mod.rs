// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool-call orchestration
//!
//! Implements the bounded multi-turn loop: stream a model turn, and when the
//! model requests a tool, invoke it, append the result as a new turn and
//! resubmit, until the model produces a turn with no tool request. The loop
//! carries an explicit iteration cap; a model that keeps requesting tools
//! surfaces `ToolLoopExceeded` instead of looping forever.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::PipelineConfig;
use crate::error::{ApiError, AtelierError, Result};
use crate::llm::message::Message;
use crate::llm::provider::{
    CompletionRequest, ModelProvider, StopReason, StreamEvent, ToolUseRequest,
};
use crate::llm::registry::GenerationProfile;
use crate::relay::{RelayEvent, StreamAccumulator};
use crate::tools::ToolRegistry;

/// Configuration for the tool loop
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum tool invocations per generation
    pub max_tool_iterations: usize,
    /// Overall deadline for the whole generation stream
    pub stream_timeout: Duration,
    /// Deadline for a single tool invocation
    pub tool_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 5,
            stream_timeout: Duration::from_secs(300),
            tool_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&PipelineConfig> for OrchestratorConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_tool_iterations: config.max_tool_iterations,
            stream_timeout: Duration::from_secs(config.stream_timeout_secs),
            ..Self::default()
        }
    }
}

/// Outcome of one orchestrated generation
#[derive(Debug)]
pub struct TurnResult {
    /// Full text of the final assistant turn
    pub text: String,
    /// Whether the consumer went away before the stream finished
    pub cancelled: bool,
}

/// Bounded ReAct-style tool loop over a model provider
pub struct ToolOrchestrator {
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

impl ToolOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Run the loop to completion.
    ///
    /// Text deltas are forwarded through `sink` as they arrive. Tool result
    /// turns and the final assistant turn are appended to `messages` in
    /// observation order; the history is left intact even when the loop
    /// bound is exceeded.
    pub async fn run(
        &self,
        messages: &mut Vec<Message>,
        profile: &GenerationProfile,
        system: Option<&str>,
        sink: Option<&mpsc::Sender<RelayEvent>>,
    ) -> Result<TurnResult> {
        let deadline = Instant::now() + self.config.stream_timeout;

        for iteration in 0..=self.config.max_tool_iterations {
            let mut request = CompletionRequest::new(&profile.model_id, messages.clone())
                .with_max_tokens(profile.max_tokens)
                .with_temperature(profile.temperature)
                .with_tools(self.tools.definitions());
            if let Some(system) = system {
                request = request.with_system(system);
            }

            let mut stream = self.provider.complete_stream(request).await?;
            let mut accumulator = StreamAccumulator::new();
            let mut cancelled = false;

            loop {
                let next = tokio::time::timeout_at(deadline, stream.next())
                    .await
                    .map_err(|_| AtelierError::Api(ApiError::Timeout))?;
                let Some(event) = next else {
                    break;
                };
                let event = event?;

                if let StreamEvent::Error {
                    error_type,
                    message,
                } = &event
                {
                    return Err(AtelierError::Api(ApiError::StreamError(format!(
                        "{error_type}: {message}"
                    ))));
                }

                if let Some(delta) = accumulator.process(event) {
                    if let Some(tx) = sink {
                        if tx.send(RelayEvent::Chunk { content: delta }).await.is_err() {
                            // Consumer dropped the stream; let the turn wind
                            // down without forwarding further chunks.
                            cancelled = true;
                            break;
                        }
                    }
                }
            }

            let turn = accumulator.finish();

            if cancelled {
                return Ok(TurnResult {
                    text: turn.text,
                    cancelled: true,
                });
            }

            let wants_tool =
                !turn.tool_calls.is_empty() || turn.stop_reason == Some(StopReason::ToolUse);

            if !wants_tool {
                messages.push(Message::assistant(turn.text.clone()));
                return Ok(TurnResult {
                    text: turn.text,
                    cancelled: false,
                });
            }

            if iteration == self.config.max_tool_iterations {
                break;
            }

            // Strictly sequential turn-taking: service the first requested
            // call only, even if the model asked for several in parallel.
            // A tool-use stop with no assembled call is treated as final.
            let Some(call) = turn.tool_calls.first() else {
                messages.push(Message::assistant(turn.text.clone()));
                return Ok(TurnResult {
                    text: turn.text,
                    cancelled: false,
                });
            };

            tracing::debug!(tool = %call.name, iteration, "servicing tool call");
            let result_text = self.invoke_tool(call).await;
            messages.push(Message::tool(call.id.clone(), result_text));
        }

        Err(AtelierError::ToolLoopExceeded {
            max_iterations: self.config.max_tool_iterations,
        })
    }

    /// Invoke one tool, capturing failures and timeouts as result content so
    /// the model can react to them in its next turn.
    async fn invoke_tool(&self, call: &ToolUseRequest) -> String {
        let Some(tool) = self.tools.get(&call.name) else {
            return format!("Error: unknown tool '{}'", call.name);
        };

        match tokio::time::timeout(self.config.tool_timeout, tool.invoke(call.arguments.clone()))
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => format!("Error: {e}"),
            Err(_) => "Error: tool invocation timed out".to_string(),
        }
    }
}
