// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Incremental tagged-section scanner
//!
//! The scanner consumes the growing response buffer left to right exactly
//! once, retaining its position and open-section state between calls, so a
//! long generation is never rescanned from the start. Parsing never fails:
//! malformed input degrades to plain text or fewer sections.
//!
//! Callers pass the full buffer accumulated so far on every call. The
//! buffer must be prefix-stable between calls; a shrinking buffer resets
//! the scanner.

use super::{ParsedDocument, SectionTag};

/// Wrapper markers are transparent: they delimit the document but produce
/// neither a section nor plain text.
const WRAPPER_OPEN: &str = "<THOUGHTS>";
const WRAPPER_CLOSE: &str = "</THOUGHTS>";

/// Incremental parser over a growing response buffer
#[derive(Debug, Default)]
pub struct SectionParser {
    /// Bytes of the buffer already consumed into the document
    consumed: usize,
    /// Currently open section, if any
    open: Option<SectionTag>,
    /// Whether the trailing plain segment is still growing
    plain_open: bool,
    /// The document built so far
    doc: ParsedDocument,
}

/// Result of matching the head of the buffer against the known markers
enum MarkerMatch {
    /// A full opening marker for a section tag
    Open(SectionTag, usize),
    /// A full wrapper marker to skip
    Wrapper(usize),
    /// The buffer ends in the middle of a possible marker
    Partial,
    /// Not a marker
    None,
}

impl SectionParser {
    /// Create a fresh scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state and start over
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The document parsed so far
    pub fn document(&self) -> &ParsedDocument {
        &self.doc
    }

    /// Parse the buffer accumulated so far.
    ///
    /// `is_final` marks the last call for this stream: held-back bytes that
    /// could have started a marker are flushed, and still-open sections stay
    /// incomplete indefinitely.
    pub fn parse(&mut self, buffer: &str, is_final: bool) -> &ParsedDocument {
        if buffer.len() < self.consumed {
            self.reset();
        }

        loop {
            let rem = &buffer[self.consumed..];
            if rem.is_empty() {
                break;
            }

            match self.open {
                Some(tag) => {
                    let close = tag.close_marker();
                    if let Some(idx) = rem.find(close) {
                        self.append_section(tag, &rem[..idx]);
                        self.complete_section(tag);
                        self.consumed += idx + close.len();
                        self.open = None;
                    } else {
                        // Hold back a tail that could be the start of the
                        // closing marker; everything before it is content.
                        let hold = partial_suffix_len(rem, close);
                        let safe = rem.len() - hold;
                        if safe > 0 {
                            self.append_section(tag, &rem[..safe]);
                            self.consumed += safe;
                        }
                        if is_final && hold > 0 {
                            self.append_section(tag, &rem[safe..]);
                            self.consumed = buffer.len();
                        }
                        break;
                    }
                }
                None => {
                    match rem.find('<') {
                        None => {
                            self.append_plain(rem);
                            self.consumed += rem.len();
                            break;
                        }
                        Some(idx) if idx > 0 => {
                            self.append_plain(&rem[..idx]);
                            self.consumed += idx;
                        }
                        Some(_) => match self.match_marker(rem) {
                            MarkerMatch::Open(tag, len) => {
                                self.consumed += len;
                                self.start_section(tag);
                            }
                            MarkerMatch::Wrapper(len) => {
                                self.consumed += len;
                            }
                            MarkerMatch::Partial => {
                                if is_final {
                                    self.append_plain(rem);
                                    self.consumed = buffer.len();
                                }
                                break;
                            }
                            MarkerMatch::None => {
                                self.append_plain("<");
                                self.consumed += 1;
                            }
                        },
                    }
                }
            }
        }

        &self.doc
    }

    /// Match the head of the remaining buffer (which starts with `<`)
    /// against the opening markers and the wrapper markers.
    fn match_marker(&self, rem: &str) -> MarkerMatch {
        for tag in SectionTag::ALL {
            let marker = tag.open_marker();
            if rem.starts_with(marker) {
                // Duplicate tags are not supported: first match wins, a
                // later occurrence degrades to plain text.
                if self.doc.get(tag).is_some() {
                    return MarkerMatch::None;
                }
                return MarkerMatch::Open(tag, marker.len());
            }
        }
        for marker in [WRAPPER_OPEN, WRAPPER_CLOSE] {
            if rem.starts_with(marker) {
                return MarkerMatch::Wrapper(marker.len());
            }
        }

        let could_extend = SectionTag::ALL
            .iter()
            .map(|t| t.open_marker())
            .chain([WRAPPER_OPEN, WRAPPER_CLOSE])
            .any(|marker| rem.len() < marker.len() && marker.starts_with(rem));

        if could_extend {
            MarkerMatch::Partial
        } else {
            MarkerMatch::None
        }
    }

    fn start_section(&mut self, tag: SectionTag) {
        self.doc.push_section(tag);
        self.open = Some(tag);
        self.plain_open = false;
    }

    fn append_section(&mut self, tag: SectionTag, text: &str) {
        if let Some(section) = self.doc.section_mut(tag) {
            section.content.push_str(text);
        }
    }

    fn complete_section(&mut self, tag: SectionTag) {
        if let Some(section) = self.doc.section_mut(tag) {
            section.complete = true;
        }
    }

    fn append_plain(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.plain_open {
            self.doc.append_last_plain(text);
        } else {
            self.doc.push_plain(text.to_string());
            self.plain_open = true;
        }
    }
}

/// Length of the longest buffer suffix that is a proper prefix of `marker`
fn partial_suffix_len(text: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(text.len());
    for len in (1..=max).rev() {
        if text.ends_with(&marker[..len]) {
            return len;
        }
    }
    0
}

/// Parse a complete buffer with a fresh scanner.
///
/// Convenience for callers that hold the whole buffer; streaming callers
/// should keep a [`SectionParser`] across calls instead.
pub fn parse_document(buffer: &str, is_final: bool) -> ParsedDocument {
    let mut parser = SectionParser::new();
    parser.parse(buffer, is_final);
    parser.document().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== One-shot parsing =====

    #[test]
    fn test_parse_empty() {
        let doc = parse_document("", true);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_plain_only() {
        let doc = parse_document("just some text", true);
        assert!(doc.sections().is_empty());
        assert_eq!(doc.plain(), &["just some text".to_string()]);
    }

    #[test]
    fn test_parse_single_complete_code() {
        let doc = parse_document("<CODE>function App(){return null;}</CODE>", true);

        let code = doc.code().unwrap();
        assert!(code.complete);
        assert_eq!(code.content, "function App(){return null;}");
        assert_eq!(doc.require_code().unwrap(), "function App(){return null;}");
    }

    #[test]
    fn test_parse_full_grammar() {
        let buffer = "<ANALYSIS>plan</ANALYSIS><EXTRA_LIBRARIES><LIBRARY><NAME>recharts</NAME><VERSION>2.0.0</VERSION></LIBRARY></EXTRA_LIBRARIES><CODE>code here</CODE><VERIFICATION>- [x] done</VERIFICATION><EXPLANATION>why</EXPLANATION>";
        let doc = parse_document(buffer, true);

        assert_eq!(doc.sections().len(), 5);
        for (_, section) in doc.sections() {
            assert!(section.complete);
        }
        assert_eq!(doc.get(SectionTag::Analysis).unwrap().content, "plan");
        assert_eq!(doc.get(SectionTag::Explanation).unwrap().content, "why");
    }

    #[test]
    fn test_parse_half_open_stream() {
        // Scenario: analysis closed, code still arriving
        let doc = parse_document("<ANALYSIS>ok</ANALYSIS><CODE>const x=1;", false);

        let analysis = doc.get(SectionTag::Analysis).unwrap();
        assert!(analysis.complete);
        assert_eq!(analysis.content, "ok");

        let code = doc.code().unwrap();
        assert!(!code.complete);
        assert_eq!(code.content, "const x=1;");
    }

    #[test]
    fn test_parse_never_closed_tag_stays_incomplete() {
        let doc = parse_document("<VERIFICATION>- [ ] item", true);

        let section = doc.get(SectionTag::Verification).unwrap();
        assert!(!section.complete);
        assert_eq!(section.content, "- [ ] item");
    }

    #[test]
    fn test_parse_plain_around_sections() {
        let doc = parse_document("intro <CODE>x</CODE> outro", true);

        assert_eq!(doc.plain().len(), 2);
        assert_eq!(doc.plain()[0], "intro ");
        assert_eq!(doc.plain()[1], " outro");
    }

    #[test]
    fn test_parse_duplicate_tag_first_wins() {
        let doc = parse_document("<CODE>a</CODE><CODE>b</CODE>", true);

        assert_eq!(doc.code().unwrap().content, "a");
        // The second occurrence degrades to plain text
        let plain: String = doc.plain().concat();
        assert!(plain.contains("<CODE>b</CODE>"));
    }

    #[test]
    fn test_parse_angle_brackets_inside_code() {
        let doc = parse_document("<CODE>const a = <div>hi</div>;</CODE>", true);

        let code = doc.code().unwrap();
        assert!(code.complete);
        assert_eq!(code.content, "const a = <div>hi</div>;");
    }

    #[test]
    fn test_parse_unknown_tag_is_plain() {
        let doc = parse_document("<UNKNOWN>text</UNKNOWN>", true);

        assert!(doc.sections().is_empty());
        assert_eq!(doc.plain().concat(), "<UNKNOWN>text</UNKNOWN>");
    }

    #[test]
    fn test_parse_wrapper_markers_are_transparent() {
        let doc = parse_document("<THOUGHTS><ANALYSIS>a</ANALYSIS></THOUGHTS>", true);

        assert_eq!(doc.get(SectionTag::Analysis).unwrap().content, "a");
        assert!(doc.plain().is_empty());
    }

    #[test]
    fn test_parse_idempotent_on_final_buffer() {
        let buffer = "<ANALYSIS>a</ANALYSIS><CODE>b</CODE>trailing";
        let first = parse_document(buffer, true);
        let second = parse_document(buffer, true);
        assert_eq!(first, second);
    }

    // ===== Incremental scanning =====

    #[test]
    fn test_incremental_growth_extends_open_section() {
        let mut parser = SectionParser::new();

        parser.parse("<CODE>const", false);
        assert_eq!(parser.document().code().unwrap().content, "const");

        parser.parse("<CODE>const x=1;", false);
        assert_eq!(parser.document().code().unwrap().content, "const x=1;");

        parser.parse("<CODE>const x=1;</CODE>", false);
        let code = parser.document().code().unwrap();
        assert!(code.complete);
        assert_eq!(code.content, "const x=1;");
    }

    #[test]
    fn test_incremental_partial_close_marker_held_back() {
        let mut parser = SectionParser::new();

        parser.parse("<CODE>x</CO", false);
        // "</CO" could still become the closing tag, so it is not content yet
        assert_eq!(parser.document().code().unwrap().content, "x");

        parser.parse("<CODE>x</CODE>", false);
        let code = parser.document().code().unwrap();
        assert!(code.complete);
        assert_eq!(code.content, "x");
    }

    #[test]
    fn test_incremental_false_close_marker_becomes_content() {
        let mut parser = SectionParser::new();

        parser.parse("<CODE>x</CO", false);
        parser.parse("<CODE>x</COX more", false);
        assert_eq!(parser.document().code().unwrap().content, "x</COX more");
    }

    #[test]
    fn test_incremental_partial_open_marker_held_back() {
        let mut parser = SectionParser::new();

        parser.parse("<ANA", false);
        assert!(parser.document().is_empty());

        parser.parse("<ANALYSIS>go", false);
        assert_eq!(
            parser.document().get(SectionTag::Analysis).unwrap().content,
            "go"
        );
    }

    #[test]
    fn test_incremental_final_flushes_partial_marker_as_plain() {
        let mut parser = SectionParser::new();
        parser.parse("text <CO", true);
        assert_eq!(parser.document().plain().concat(), "text <CO");
    }

    #[test]
    fn test_incremental_final_flushes_partial_close_into_content() {
        let mut parser = SectionParser::new();
        parser.parse("<CODE>x</CO", true);
        let code = parser.document().code().unwrap();
        assert!(!code.complete);
        assert_eq!(code.content, "x</CO");
    }

    #[test]
    fn test_incremental_shrinking_buffer_resets() {
        let mut parser = SectionParser::new();
        parser.parse("<CODE>a much longer first buffer", false);
        parser.parse("<CODE>xy</CODE>", false);

        let code = parser.document().code().unwrap();
        assert!(code.complete);
        assert_eq!(code.content, "xy");
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let buffer = "pre<THOUGHTS></THOUGHTS><ANALYSIS>a</ANALYSIS>mid<CODE>b</CODE>post";

        let mut incremental = SectionParser::new();
        for end in 0..=buffer.len() {
            if buffer.is_char_boundary(end) {
                incremental.parse(&buffer[..end], false);
            }
        }
        incremental.parse(buffer, true);

        assert_eq!(*incremental.document(), parse_document(buffer, true));
    }

    #[test]
    fn test_incremental_plain_segment_grows() {
        let mut parser = SectionParser::new();
        parser.parse("hello", false);
        parser.parse("hello world", false);

        assert_eq!(parser.document().plain(), &["hello world".to_string()]);
    }

    // ===== partial_suffix_len =====

    #[test]
    fn test_partial_suffix_len() {
        assert_eq!(partial_suffix_len("abc</CO", "</CODE>"), 4);
        assert_eq!(partial_suffix_len("abc<", "</CODE>"), 1);
        assert_eq!(partial_suffix_len("abc", "</CODE>"), 0);
        assert_eq!(partial_suffix_len("abc</CODE", "</CODE>"), 6);
    }
}
