//! Conversation messages and model responses.
//!
//! The pipeline only ever sends plain text and receives plain text (a JSON
//! document, when structured output is requested), so content is a short
//! list of [`ContentBlock`]s rather than a rich multimodal tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::usage::Usage;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions that frame the whole exchange.
    System,
    /// The caller.
    User,
    /// The model.
    Assistant,
}

/// One piece of message or response content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ContentBlock {
    /// Plain text.
    Text(String),
    /// The model declined to answer; carries its explanation.
    Refusal(String),
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author of this message.
    pub role: ChatRole,
    /// Message content, in order.
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// A text message from the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(ChatRole::User, text)
    }

    /// A text message from the model.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, text)
    }

    /// A system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(ChatRole::System, text)
    }

    fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text(text.into())],
        }
    }

    /// Concatenated text blocks of this message.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(t) => Some(t.as_str()),
                ContentBlock::Refusal(_) => None,
            })
            .collect()
    }
}

/// Why the model stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StopReason {
    /// The model finished its answer.
    EndTurn,
    /// Generation hit the token limit; the output is likely truncated.
    MaxTokens,
    /// Output was withheld by a content filter.
    ContentFilter,
    /// A configured stop sequence was produced.
    StopSequence,
}

/// A complete, non-streamed model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Response content, in order.
    pub content: Vec<ContentBlock>,
    /// Token accounting for this request.
    pub usage: Usage,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// The model that actually served the request.
    pub model: String,
    /// Provider-specific extras (request ids, fingerprints).
    pub metadata: HashMap<String, Value>,
}

impl ChatResponse {
    /// Concatenated text blocks, or `None` if the response has no text.
    pub fn text(&self) -> Option<String> {
        let mut out: Option<String> = None;
        for block in &self.content {
            if let ContentBlock::Text(t) = block {
                out.get_or_insert_with(String::new).push_str(t);
            }
        }
        out
    }

    /// The model's refusal message, if it declined to answer.
    pub fn refusal(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Refusal(r) => Some(r.as_str()),
            ContentBlock::Text(_) => None,
        })
    }
}
