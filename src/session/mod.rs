// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Generation session
//!
//! The in-memory unit of one prompt-to-code interaction: an append-only
//! message history, the currently streaming buffer with its incrementally
//! parsed sections, and the retained versions of generated code. The model
//! is pinned at creation so every fix cycle reuses the model that produced
//! the original code.

use uuid::Uuid;

use crate::document::{parse_dependencies, Dependency, ParsedDocument, SectionParser, SectionTag};
use crate::error::{AtelierError, Result};
use crate::llm::message::Message;

/// One retained generation result
#[derive(Debug, Clone)]
pub struct Version {
    /// Completed CODE section content
    pub code: String,
    /// Dependencies declared alongside the code
    pub dependencies: Vec<Dependency>,
}

/// State owner for one prompt-to-code interaction
pub struct GenerationSession {
    id: Uuid,
    model: String,
    messages: Vec<Message>,
    streaming: bool,
    buffer: String,
    parser: SectionParser,
    versions: Vec<Version>,
}

impl GenerationSession {
    /// Create a session pinned to a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            messages: vec![],
            streaming: false,
            buffer: String::new(),
            parser: SectionParser::new(),
            versions: vec![],
        }
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The pinned model selector
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Append a message. Messages are immutable once appended; ordering is
    /// the sole conversation truth.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The ordered message history
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a stream is currently open
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Open the session's stream.
    ///
    /// A session has exactly one in-flight stream at a time; a second begin
    /// is rejected until the prior stream is committed or discarded.
    pub fn begin_stream(&mut self) -> Result<()> {
        if self.streaming {
            return Err(AtelierError::Session(
                "a stream is already open for this session".to_string(),
            ));
        }
        self.streaming = true;
        self.buffer.clear();
        self.parser.reset();
        Ok(())
    }

    /// Apply one downstream chunk to the streaming buffer, reparsing
    /// incrementally
    pub fn apply_chunk(&mut self, content: &str) -> Result<()> {
        if !self.streaming {
            return Err(AtelierError::Session(
                "no stream is open for this session".to_string(),
            ));
        }
        self.buffer.push_str(content);
        self.parser.parse(&self.buffer, false);
        Ok(())
    }

    /// The raw streaming buffer accumulated so far
    pub fn streaming_buffer(&self) -> &str {
        &self.buffer
    }

    /// The parsed view of the streaming buffer
    pub fn parsed(&self) -> &ParsedDocument {
        self.parser.document()
    }

    /// Close the stream and promote the buffer to a final assistant message.
    ///
    /// If the document carries a completed CODE section, a version is
    /// retained and returned; otherwise the message history is still
    /// committed and `None` is returned.
    pub fn commit(&mut self) -> Result<Option<&Version>> {
        if !self.streaming {
            return Err(AtelierError::Session(
                "no stream is open for this session".to_string(),
            ));
        }

        self.parser.parse(&self.buffer, true);
        let document = self.parser.document();

        let version = document.require_code().ok().map(|code| {
            let dependencies = document
                .get(SectionTag::ExtraLibraries)
                .filter(|s| s.complete)
                .map(|s| parse_dependencies(&s.content))
                .unwrap_or_default();
            Version {
                code: code.to_string(),
                dependencies,
            }
        });

        self.messages.push(Message::assistant(self.buffer.clone()));
        if let Some(version) = version {
            self.versions.push(version);
        }

        self.streaming = false;
        self.buffer.clear();
        self.parser.reset();

        Ok(self.versions.last())
    }

    /// Close the stream and drop the buffer without committing
    pub fn discard(&mut self) {
        self.streaming = false;
        self.buffer.clear();
        self.parser.reset();
    }

    /// Number of retained versions
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// A retained version by zero-based index
    pub fn version(&self, index: usize) -> Option<&Version> {
        self.versions.get(index)
    }

    /// The most recent version
    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_turn(code: &str) -> String {
        format!("<ANALYSIS>plan</ANALYSIS><CODE>{code}</CODE><VERIFICATION>- [x] ok</VERIFICATION>")
    }

    #[test]
    fn test_session_pins_model() {
        let session = GenerationSession::new("claude-3-5-sonnet-20240620");
        assert_eq!(session.model(), "claude-3-5-sonnet-20240620");
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_begin_stream_rejects_second_begin() {
        let mut session = GenerationSession::new("claude");
        session.begin_stream().unwrap();

        let result = session.begin_stream();
        assert!(matches!(result, Err(AtelierError::Session(_))));
    }

    #[test]
    fn test_apply_chunk_requires_open_stream() {
        let mut session = GenerationSession::new("claude");
        assert!(session.apply_chunk("text").is_err());
    }

    #[test]
    fn test_streaming_updates_parsed_sections() {
        let mut session = GenerationSession::new("claude");
        session.begin_stream().unwrap();

        session.apply_chunk("<ANALYSIS>ok</ANALYSIS><CODE>const ").unwrap();
        session.apply_chunk("x=1;").unwrap();

        let parsed = session.parsed();
        assert!(parsed.get(SectionTag::Analysis).unwrap().complete);
        let code = parsed.code().unwrap();
        assert!(!code.complete);
        assert_eq!(code.content, "const x=1;");
    }

    #[test]
    fn test_commit_promotes_buffer_to_message() {
        let mut session = GenerationSession::new("claude");
        session.append(Message::user("build a toggle"));
        session.begin_stream().unwrap();
        session.apply_chunk(&full_turn("const t = 1;")).unwrap();

        let version = session.commit().unwrap();

        assert!(version.is_some());
        assert_eq!(version.unwrap().code, "const t = 1;");
        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_streaming());
        assert!(session.streaming_buffer().is_empty());
    }

    #[test]
    fn test_commit_without_code_keeps_history() {
        let mut session = GenerationSession::new("claude");
        session.begin_stream().unwrap();
        session.apply_chunk("just prose, no sections").unwrap();

        let version = session.commit().unwrap();

        assert!(version.is_none());
        assert_eq!(session.version_count(), 0);
        // The turn is still part of the conversation
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_commit_requires_open_stream() {
        let mut session = GenerationSession::new("claude");
        assert!(session.commit().is_err());
    }

    #[test]
    fn test_commit_collects_dependencies() {
        let mut session = GenerationSession::new("claude");
        session.begin_stream().unwrap();
        session
            .apply_chunk("<EXTRA_LIBRARIES><LIBRARY><NAME>recharts</NAME><VERSION>2.12.0</VERSION></LIBRARY></EXTRA_LIBRARIES><CODE>c</CODE>")
            .unwrap();

        let version = session.commit().unwrap().unwrap();

        assert_eq!(version.dependencies.len(), 1);
        assert_eq!(version.dependencies[0].name, "recharts");
    }

    #[test]
    fn test_discard_clears_buffer() {
        let mut session = GenerationSession::new("claude");
        session.begin_stream().unwrap();
        session.apply_chunk("<CODE>partial").unwrap();

        session.discard();

        assert!(!session.is_streaming());
        assert!(session.streaming_buffer().is_empty());
        assert_eq!(session.messages().len(), 0);
        // A new stream can be opened after discarding
        assert!(session.begin_stream().is_ok());
    }

    #[test]
    fn test_versions_accumulate_across_cycles() {
        let mut session = GenerationSession::new("claude");

        for code in ["v1", "v2", "v3"] {
            session.begin_stream().unwrap();
            session.apply_chunk(&full_turn(code)).unwrap();
            session.commit().unwrap();
        }

        assert_eq!(session.version_count(), 3);
        assert_eq!(session.version(0).unwrap().code, "v1");
        assert_eq!(session.latest_version().unwrap().code, "v3");
    }
}
