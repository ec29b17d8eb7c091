// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock model provider for testing
//!
//! Provides a configurable mock implementation of the ModelProvider trait
//! that can be used in unit tests without making real API calls.

use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, EventStream, ModelProvider, StopReason, StreamEvent,
    ToolUseRequest,
};

/// A mock model provider for testing
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Scripted turns, consumed in order
    turns: Arc<Mutex<Vec<MockTurn>>>,
    /// Repeat the last turn once the queue is exhausted
    repeat_last: bool,
    /// Call counter across complete and complete_stream
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A pre-configured turn for the mock provider
#[derive(Clone, Debug, Default)]
pub struct MockTurn {
    /// Text content to return
    pub text: String,
    /// Tool call to request after the text (if any)
    pub tool_call: Option<MockToolCall>,
}

/// A mock tool call
#[derive(Clone, Debug)]
pub struct MockToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool input (JSON)
    pub input: serde_json::Value,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider with a single empty turn
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            turns: Arc::new(Mutex::new(vec![MockTurn::default()])),
            repeat_last: false,
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Replace the scripted turns with a single text turn
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.with_turns(vec![MockTurn {
            text: text.into(),
            tool_call: None,
        }])
    }

    /// Replace the scripted turns
    pub fn with_turns(self, turns: Vec<MockTurn>) -> Self {
        {
            let mut guard = self.lock_turns();
            *guard = turns;
        }
        self
    }

    /// Repeat the final scripted turn forever instead of panicking on
    /// exhaustion; used to simulate a model that always requests a tool
    pub fn with_repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Number of completion calls made so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests recorded across all calls
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        match self.recorded_requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_turns(&self) -> std::sync::MutexGuard<'_, Vec<MockTurn>> {
        match self.turns.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Mock provider turns lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn next_turn(&self, request: &CompletionRequest) -> MockTurn {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match self.recorded_requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        let mut turns = self.lock_turns();
        if turns.len() > 1 || !self.repeat_last {
            if turns.is_empty() {
                return MockTurn::default();
            }
            turns.remove(0)
        } else {
            turns.first().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let turn = self.next_turn(&request);

        let (tool_calls, stop_reason) = match turn.tool_call {
            Some(tc) => (
                vec![ToolUseRequest {
                    id: tc.id,
                    name: tc.name,
                    arguments: tc.input,
                }],
                StopReason::ToolUse,
            ),
            None => (vec![], StopReason::EndTurn),
        };

        Ok(CompletionResponse {
            id: format!("mock_{}", self.call_count()),
            model: request.model,
            text: turn.text,
            tool_calls,
            stop_reason: Some(stop_reason),
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let turn = self.next_turn(&request);

        let mut events: Vec<Result<StreamEvent>> = vec![Ok(StreamEvent::MessageStart {
            id: format!("mock_{}", self.call_count()),
            model: request.model.clone(),
        })];

        // Split the text into small deltas to exercise incremental consumers
        for chunk in split_into_deltas(&turn.text) {
            events.push(Ok(StreamEvent::TextDelta { text: chunk }));
        }

        let stop_reason = if let Some(tc) = turn.tool_call {
            events.push(Ok(StreamEvent::ToolUseStart {
                index: 1,
                id: tc.id,
                name: tc.name,
            }));
            events.push(Ok(StreamEvent::ToolInputDelta {
                index: 1,
                partial_json: tc.input.to_string(),
            }));
            events.push(Ok(StreamEvent::BlockStop { index: 1 }));
            StopReason::ToolUse
        } else {
            StopReason::EndTurn
        };

        events.push(Ok(StreamEvent::MessageDelta {
            stop_reason: Some(stop_reason),
        }));
        events.push(Ok(StreamEvent::MessageStop));

        Ok(Box::pin(stream::iter(events)))
    }
}

/// Split text into delta-sized chunks on whitespace boundaries
fn split_into_deltas(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    let mut deltas = Vec::new();
    let mut current = String::new();
    for word in text.split_inclusive(' ') {
        current.push_str(word);
        if current.len() >= 16 {
            deltas.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        deltas.push(current);
    }
    deltas
}
