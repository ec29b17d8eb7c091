// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Server-sent event envelope
//!
//! The wire format is `data: <json>\n\n`, one JSON object per emitted delta.
//! Two payload shapes share the envelope: the raw variant `{"text": ...}`
//! and the multi-turn variant `{"content": ...}` where `content` is itself a
//! JSON-encoded array of `{index, text, type}` deltas. Stream closure
//! signals completion; there is no explicit end-of-stream sentinel.

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::relay::RelayEvent;

/// One delta inside the multi-turn content payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDelta {
    pub index: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContentDelta {
    /// A text delta at the given block index
    pub fn text_delta(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            kind: "text_delta".to_string(),
        }
    }
}

/// Decoded downstream payload
#[derive(Debug, Clone, PartialEq)]
pub enum SsePayload {
    /// Raw variant: a plain text delta
    Text(String),
    /// Multi-turn variant: structured deltas
    Content(Vec<ContentDelta>),
    /// Terminal error
    Error(String),
}

/// Encode a raw text delta event
pub fn encode_text(text: &str) -> String {
    let payload = serde_json::json!({ "text": text });
    format!("data: {}\n\n", payload)
}

/// Encode a multi-turn content event.
///
/// The delta array is JSON-encoded into a string and carried inside the
/// outer envelope, so the outer shape stays fixed as content grows richer.
pub fn encode_content(deltas: &[ContentDelta]) -> String {
    let inner = serde_json::to_string(deltas).unwrap_or_default();
    let payload = serde_json::json!({ "content": inner });
    format!("data: {}\n\n", payload)
}

/// Encode a terminal error event
pub fn encode_error(message: &str) -> String {
    let payload = serde_json::json!({ "error": message });
    format!("data: {}\n\n", payload)
}

/// Turn a relay event receiver into a stream of wire frames.
///
/// Chunks become raw-variant frames, a terminal error becomes an error
/// frame, and `Done` is silent: stream closure signals completion.
pub fn sse_frames(mut rx: mpsc::Receiver<RelayEvent>) -> impl Stream<Item = String> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match event {
                RelayEvent::Chunk { content } => yield encode_text(&content),
                RelayEvent::Error { message } => yield encode_error(&message),
                RelayEvent::Done => {}
            }
        }
    }
}

/// Incremental decoder for the event stream.
///
/// Chunks may split frames at arbitrary byte positions; partial frames are
/// buffered until their terminator arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns all payloads completed by it
    pub fn feed(&mut self, chunk: &str) -> Vec<SsePayload> {
        self.buffer.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + 2..].to_string();

            for line in frame.lines() {
                if let Some(data) = line.strip_prefix("data: ") {
                    if let Some(payload) = decode_payload(data) {
                        payloads.push(payload);
                    }
                }
            }
        }
        payloads
    }

    /// Whether a partial frame is still buffered
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Decode one `data:` payload; malformed payloads are dropped
fn decode_payload(data: &str) -> Option<SsePayload> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;

    if let Some(text) = value.get("text").and_then(|t| t.as_str()) {
        return Some(SsePayload::Text(text.to_string()));
    }
    if let Some(content) = value.get("content").and_then(|c| c.as_str()) {
        let deltas: Vec<ContentDelta> = serde_json::from_str(content).ok()?;
        return Some(SsePayload::Content(deltas));
    }
    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        return Some(SsePayload::Error(error.to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text() {
        let frame = encode_text("hello");
        assert_eq!(frame, "data: {\"text\":\"hello\"}\n\n");
    }

    #[test]
    fn test_encode_content_nests_json_string() {
        let frame = encode_content(&[ContentDelta::text_delta(0, "hi")]);

        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
        // The inner array is a JSON-encoded string, not a bare array
        let value: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert!(value["content"].is_string());
    }

    #[test]
    fn test_text_roundtrip() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(&encode_text("chunk one"));

        assert_eq!(payloads, vec![SsePayload::Text("chunk one".to_string())]);
    }

    #[test]
    fn test_content_roundtrip() {
        let deltas = vec![
            ContentDelta::text_delta(0, "a"),
            ContentDelta::text_delta(0, "b"),
        ];
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(&encode_content(&deltas));

        assert_eq!(payloads, vec![SsePayload::Content(deltas)]);
    }

    #[test]
    fn test_error_roundtrip() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(&encode_error("upstream failed"));

        assert_eq!(
            payloads,
            vec![SsePayload::Error("upstream failed".to_string())]
        );
    }

    #[test]
    fn test_decoder_split_frame() {
        let frame = encode_text("split across chunks");
        let (first, second) = frame.split_at(12);

        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(first).is_empty());
        assert!(decoder.has_partial());

        let payloads = decoder.feed(second);
        assert_eq!(
            payloads,
            vec![SsePayload::Text("split across chunks".to_string())]
        );
        assert!(!decoder.has_partial());
    }

    #[test]
    fn test_decoder_multiple_frames_in_one_chunk() {
        let chunk = format!("{}{}", encode_text("one"), encode_text("two"));

        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(&chunk);

        assert_eq!(payloads.len(), 2);
    }

    #[test]
    fn test_decoder_drops_malformed_payloads() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed("data: {not json}\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn test_decoder_ignores_non_data_lines() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(": keep-alive\nretry: 500\n\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn test_decode_payload_unknown_shape() {
        assert!(decode_payload("{\"other\": 1}").is_none());
    }

    #[tokio::test]
    async fn test_sse_frames_from_relay_events() {
        use futures_util::StreamExt;

        let (tx, rx) = mpsc::channel(8);
        tx.send(RelayEvent::Chunk {
            content: "a".to_string(),
        })
        .await
        .unwrap();
        tx.send(RelayEvent::Done).await.unwrap();
        drop(tx);

        let frames: Vec<String> = sse_frames(rx).collect().await;

        // Done produces no frame; closure is the completion signal
        assert_eq!(frames, vec![encode_text("a")]);
    }

    #[tokio::test]
    async fn test_sse_frames_terminal_error() {
        use futures_util::StreamExt;

        let (tx, rx) = mpsc::channel(8);
        tx.send(RelayEvent::Error {
            message: "upstream failed".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        let frames: Vec<String> = sse_frames(rx).collect().await;
        assert_eq!(frames, vec![encode_error("upstream failed")]);
    }
}
