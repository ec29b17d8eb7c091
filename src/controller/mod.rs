// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Compile-feedback controller
//!
//! Closes the loop between generated code and its actual behavior in the
//! sandbox: `idle -> generating -> compiling -> (success: idle) |
//! (error: awaiting_fix -> generating ...)`. The first detected error
//! triggers one automatic fix cycle; further cycles are explicitly
//! requested, and a per-session ceiling surfaces `FixLimitExceeded` instead
//! of looping silently.

use crate::config::PipelineConfig;
use crate::error::{ApiError, AtelierError, Result};
use crate::llm::message::Message;
use crate::llm::registry::{self, GenerationProfile};
use crate::prompt;
use crate::relay::{RelayEvent, StreamRelay};
use crate::sandbox::{CompileError, CompileOutcome, Sandbox, SandboxWorkspace};
use crate::session::{GenerationSession, Version};

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixState {
    Idle,
    Generating,
    Compiling,
    AwaitingFix,
}

/// Decision taken for one observed sandbox error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixDecision {
    /// A fix request was appended and a regeneration should run
    Fix,
    /// A fix is already in flight; the error was coalesced
    Coalesced,
}

/// Result of one generate-and-compile drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// The preview compiled and is running
    Success,
    /// The sandbox reported an error and no automatic fix remains;
    /// the user decides whether to retry
    AwaitingFix(CompileError),
}

/// Drives generation, compilation and bounded auto-fix for one artifact
pub struct FixController {
    state: FixState,
    fix_in_flight: bool,
    auto_fix_used: bool,
    fix_attempts: u32,
    max_fix_attempts: u32,
    version_cursor: usize,
}

impl FixController {
    /// Create a controller with an explicit fix ceiling
    pub fn new(max_fix_attempts: u32) -> Self {
        Self {
            state: FixState::Idle,
            fix_in_flight: false,
            auto_fix_used: false,
            fix_attempts: 0,
            max_fix_attempts,
            version_cursor: 0,
        }
    }

    /// Create a controller from pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_fix_attempts)
    }

    /// Current state
    pub fn state(&self) -> FixState {
        self.state
    }

    /// Fix attempts consumed so far
    pub fn fix_attempts(&self) -> u32 {
        self.fix_attempts
    }

    /// Handle a sandbox error event.
    ///
    /// At most one fix cycle runs per artifact at a time: an error arriving
    /// while a fix is in flight is coalesced, not queued. Otherwise a
    /// corrective user message is appended to the session (content
    /// composition only, no other history mutation) and the caller should
    /// re-enter generation with the session's pinned model.
    pub fn observe_error(
        &mut self,
        session: &mut GenerationSession,
        error: &CompileError,
    ) -> Result<FixDecision> {
        if self.fix_in_flight {
            tracing::debug!("fix already in flight, coalescing sandbox error");
            return Ok(FixDecision::Coalesced);
        }

        if self.fix_attempts >= self.max_fix_attempts {
            return Err(AtelierError::FixLimitExceeded {
                attempts: self.fix_attempts,
            });
        }

        self.fix_attempts += 1;
        self.fix_in_flight = true;
        self.state = FixState::AwaitingFix;
        session.append(Message::user(prompt::fix_prompt(&error.message)));

        Ok(FixDecision::Fix)
    }

    /// Run generation and compilation until the preview runs, the automatic
    /// fix budget for this drive is spent, or an error surfaces.
    ///
    /// The first sandbox error triggers exactly one automatic fix cycle;
    /// a further error is reported as `AwaitingFix` for the user to act on.
    pub async fn run_generation(
        &mut self,
        session: &mut GenerationSession,
        relay: &StreamRelay,
        sandbox: &dyn Sandbox,
        workspace: &mut SandboxWorkspace,
    ) -> Result<CycleReport> {
        loop {
            self.state = FixState::Generating;

            let version = match self.stream_into_session(session, relay).await {
                Ok(version) => version,
                Err(e) => {
                    self.state = FixState::Idle;
                    self.fix_in_flight = false;
                    return Err(e);
                }
            };

            self.state = FixState::Compiling;
            // Only the controller writes the component file
            workspace.stage(&version.code, &version.dependencies);
            self.version_cursor = session.version_count();

            let outcome = match sandbox
                .compile(&workspace.files, &workspace.dependencies)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.state = FixState::Idle;
                    self.fix_in_flight = false;
                    return Err(e);
                }
            };

            // Whatever fix was in flight has now resolved into this outcome
            self.fix_in_flight = false;

            match outcome {
                CompileOutcome::Success => {
                    self.state = FixState::Idle;
                    return Ok(CycleReport::Success);
                }
                CompileOutcome::Error { error } => {
                    tracing::info!(message = %error.message, "sandbox reported an error");
                    if self.auto_fix_used || self.fix_attempts >= self.max_fix_attempts {
                        self.state = FixState::AwaitingFix;
                        return Ok(CycleReport::AwaitingFix(error));
                    }
                    self.auto_fix_used = true;
                    match self.observe_error(session, &error)? {
                        FixDecision::Fix => continue,
                        FixDecision::Coalesced => {
                            self.state = FixState::AwaitingFix;
                            return Ok(CycleReport::AwaitingFix(error));
                        }
                    }
                }
            }
        }
    }

    /// Stream one generation into the session and commit it.
    ///
    /// The model is resolved from the session's pinned selector on every
    /// cycle, guaranteeing stylistic consistency across fixes.
    async fn stream_into_session(
        &mut self,
        session: &mut GenerationSession,
        relay: &StreamRelay,
    ) -> Result<Version> {
        session.begin_stream()?;

        let profile = GenerationProfile::from(registry::resolve(session.model()));
        let mut rx = relay.open(
            session.messages().to_vec(),
            profile,
            Some(prompt::SYSTEM_PROMPT.to_string()),
        );

        while let Some(event) = rx.recv().await {
            match event {
                RelayEvent::Chunk { content } => session.apply_chunk(&content)?,
                RelayEvent::Done => {
                    let version = session.commit()?.cloned();
                    return version.ok_or(AtelierError::NoCodeSection);
                }
                RelayEvent::Error { message } => {
                    session.discard();
                    return Err(AtelierError::Api(ApiError::StreamError(message)));
                }
            }
        }

        session.discard();
        Err(AtelierError::Api(ApiError::StreamError(
            "stream closed without a terminal event".to_string(),
        )))
    }

    // ----- version navigation: pure history replay, no model calls -----

    /// Total retained versions
    pub fn total_versions(&self, session: &GenerationSession) -> usize {
        session.version_count()
    }

    /// Current version number, 1-based; 0 when nothing is retained
    pub fn current_version(&self) -> usize {
        self.version_cursor
    }

    /// The currently selected version
    pub fn current<'a>(&self, session: &'a GenerationSession) -> Option<&'a Version> {
        session.version(self.version_cursor.checked_sub(1)?)
    }

    /// Step to the previous version, clamped at the first
    pub fn previous_version<'a>(
        &mut self,
        session: &'a GenerationSession,
    ) -> Option<&'a Version> {
        if self.version_cursor > 1 {
            self.version_cursor -= 1;
        }
        self.current(session)
    }

    /// Step to the next version, clamped at the latest
    pub fn next_version<'a>(&mut self, session: &'a GenerationSession) -> Option<&'a Version> {
        if self.version_cursor < session.version_count() {
            self.version_cursor += 1;
        }
        self.current(session)
    }
}
