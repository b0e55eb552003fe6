//! Chat Completions wire types.
//!
//! These mirror `OpenAI`'s JSON and stay private to the crate;
//! conversion to core types happens in [`convert`](crate::convert).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Request types ──────────────────────────────────────────────────

/// Body of `POST /chat/completions`.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat<'a>>,
}

/// One outgoing message. Content is always a plain string here.
#[derive(Debug, Serialize)]
pub(crate) struct Message<'a> {
    pub role: &'static str,
    pub content: std::borrow::Cow<'a, str>,
}

/// `response_format` request field.
#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    pub format_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchemaFormat<'a>>,
}

/// The `json_schema` member of `response_format`.
#[derive(Debug, Serialize)]
pub(crate) struct JsonSchemaFormat<'a> {
    pub name: &'static str,
    pub schema: &'a Value,
    pub strict: bool,
}

// ── Response types ─────────────────────────────────────────────────

/// Body returned by `POST /chat/completions`.
#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub id: Option<String>,
    pub choices: Vec<Choice>,
    pub model: String,
    pub usage: Option<ResponseUsage>,
    #[serde(default)]
    pub system_fingerprint: Option<String>,
}

/// A single choice.
#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// The message inside a choice.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Token usage.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(default)]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

/// Breakdown of completion tokens.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u64>,
}

// ── Error types ────────────────────────────────────────────────────

/// Error body from the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_skips_absent_fields() {
        let req = Request {
            model: "gpt-4o-mini",
            messages: vec![Message {
                role: "user",
                content: "hi".into(),
            }],
            temperature: None,
            max_completion_tokens: None,
            seed: None,
            response_format: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn test_response_deserializes_refusal() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": null, "refusal": "I can't"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2}
        }"#;
        let resp: Response = serde_json::from_str(body).unwrap();
        assert_eq!(resp.choices[0].message.refusal.as_deref(), Some("I can't"));
        assert!(resp.choices[0].message.content.is_none());
    }

    #[test]
    fn test_error_response_optional_fields() {
        let body = r#"{"error": {"message": "Invalid schema", "type": "invalid_request_error"}}"#;
        let err: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(err.error.message, "Invalid schema");
        assert_eq!(err.error.error_type.as_deref(), Some("invalid_request_error"));
        assert!(err.error.code.is_none());
    }
}
