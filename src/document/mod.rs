// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tagged-section document grammar
//!
//! Model responses are structured documents built from a fixed vocabulary of
//! tags: `<ANALYSIS>`, `<EXTRA_LIBRARIES>`, `<CODE>`, `<VERIFICATION>` and
//! `<EXPLANATION>`, with at most one instance of each per assistant turn.
//! A bare `<CODE>...</CODE>` response is equally valid. This module parses
//! that grammar incrementally while the response is still streaming.

pub mod dependencies;
pub mod parser;

pub use dependencies::{parse_dependencies, Dependency, DependencySet};
pub use parser::{parse_document, SectionParser};

use crate::error::{AtelierError, Result};

/// The fixed tag vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionTag {
    Analysis,
    ExtraLibraries,
    Code,
    Verification,
    Explanation,
}

impl SectionTag {
    /// All known tags, in canonical document order
    pub const ALL: [SectionTag; 5] = [
        SectionTag::Analysis,
        SectionTag::ExtraLibraries,
        SectionTag::Code,
        SectionTag::Verification,
        SectionTag::Explanation,
    ];

    /// Tag name as it appears in the document
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionTag::Analysis => "ANALYSIS",
            SectionTag::ExtraLibraries => "EXTRA_LIBRARIES",
            SectionTag::Code => "CODE",
            SectionTag::Verification => "VERIFICATION",
            SectionTag::Explanation => "EXPLANATION",
        }
    }

    /// Opening marker, e.g. `<CODE>`
    pub fn open_marker(&self) -> &'static str {
        match self {
            SectionTag::Analysis => "<ANALYSIS>",
            SectionTag::ExtraLibraries => "<EXTRA_LIBRARIES>",
            SectionTag::Code => "<CODE>",
            SectionTag::Verification => "<VERIFICATION>",
            SectionTag::Explanation => "<EXPLANATION>",
        }
    }

    /// Closing marker, e.g. `</CODE>`
    pub fn close_marker(&self) -> &'static str {
        match self {
            SectionTag::Analysis => "</ANALYSIS>",
            SectionTag::ExtraLibraries => "</EXTRA_LIBRARIES>",
            SectionTag::Code => "</CODE>",
            SectionTag::Verification => "</VERIFICATION>",
            SectionTag::Explanation => "</EXPLANATION>",
        }
    }
}

impl std::fmt::Display for SectionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed section of the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    /// Section content, append-only while the section is open
    pub content: String,

    /// Whether the closing tag has been seen
    pub complete: bool,
}

/// The parsed view of a (possibly still growing) response buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Sections in document order; at most one entry per tag
    sections: Vec<(SectionTag, Section)>,

    /// Untagged text segments, preserved for display only
    plain: Vec<String>,
}

impl ParsedDocument {
    /// Look up a section by tag
    pub fn get(&self, tag: SectionTag) -> Option<&Section> {
        self.sections
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, s)| s)
    }

    /// Sections in document order
    pub fn sections(&self) -> &[(SectionTag, Section)] {
        &self.sections
    }

    /// Untagged text segments in document order
    pub fn plain(&self) -> &[String] {
        &self.plain
    }

    /// The CODE section, if present
    pub fn code(&self) -> Option<&Section> {
        self.get(SectionTag::Code)
    }

    /// The completed CODE content, trimmed for the sandbox.
    ///
    /// While a stream is still open, use [`ParsedDocument::code`] and treat
    /// absence as "not yet available". This accessor is for a closed stream,
    /// where a missing or never-closed CODE section is an extraction failure.
    pub fn require_code(&self) -> Result<&str> {
        match self.code() {
            Some(section) if section.complete => Ok(section.content.trim()),
            _ => Err(AtelierError::NoCodeSection),
        }
    }

    /// Whether any section or plain segment has been produced
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.plain.is_empty()
    }

    pub(crate) fn section_mut(&mut self, tag: SectionTag) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|(t, _)| *t == tag)
            .map(|(_, s)| s)
    }

    pub(crate) fn push_section(&mut self, tag: SectionTag) {
        self.sections.push((tag, Section::default()));
    }

    pub(crate) fn push_plain(&mut self, text: String) {
        self.plain.push(text);
    }

    pub(crate) fn append_last_plain(&mut self, text: &str) {
        if let Some(last) = self.plain.last_mut() {
            last.push_str(text);
        }
    }
}
