// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message types for model interactions
//!
//! Defines the conversation structures exchanged with model providers.
//! Messages are immutable once appended to a conversation; updates always
//! produce new messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in a generation conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: Uuid,

    /// Role of the message sender
    pub role: Role,

    /// Text content of the message
    pub text: String,

    /// References to externally stored attachments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Tool use ID if this is a tool result turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,

    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User request
    User,
    /// Assistant response
    Assistant,
    /// Tool result turn
    Tool,
}

/// Reference to externally stored binary content.
///
/// The pipeline never inspects attachment bytes; callers decode the content
/// to text and fold it into a message via [`Message::with_attachment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub url: String,
}

impl Message {
    /// Create a new user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            attachments: vec![],
            tool_use_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: text.into(),
            attachments: vec![],
            tool_use_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a tool result message tied to a tool use ID
    pub fn tool(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Tool,
            text: text.into(),
            attachments: vec![],
            tool_use_id: Some(tool_use_id.into()),
            timestamp: Utc::now(),
        }
    }

    /// Fold a text-decoded attachment into the message.
    ///
    /// The decoded content is appended to the message text; the attachment
    /// itself is kept as an opaque reference.
    pub fn with_attachment(mut self, attachment: Attachment, decoded_text: &str) -> Self {
        if !decoded_text.is_empty() {
            self.text
                .push_str(&format!("\n\n<{0}>\n{1}\n</{0}>", attachment.file_name, decoded_text));
        }
        self.attachments.push(attachment);
        self
    }

    /// Whether this message is a tool result turn
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool
    }
}

/// An ordered message history with an optional system prompt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// System prompt sent with every request
    pub system_prompt: Option<String>,

    /// Ordered messages; append-only
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system prompt
    pub fn set_system(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
