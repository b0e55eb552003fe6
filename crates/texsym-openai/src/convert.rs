//! Conversion between core types and `OpenAI` wire types.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;
use texsym_core::chat::{ChatMessage, ChatResponse, ChatRole, ContentBlock, StopReason};
use texsym_core::error::LlmError;
use texsym_core::provider::ChatParams;
use texsym_core::usage::Usage;

use crate::config::{OpenAiConfig, ResponseMode};
use crate::types::{ErrorResponse, JsonSchemaFormat, Message, Request, ResponseFormat};

// ── Request conversion ───────────────────────────────────────────────

/// Build a Chat Completions request from `ChatParams` and provider config.
pub(crate) fn build_request<'a>(
    params: &'a ChatParams,
    config: &'a OpenAiConfig,
) -> Result<Request<'a>, LlmError> {
    if params.messages.is_empty() {
        return Err(LlmError::InvalidRequest(
            "request must contain at least one message".into(),
        ));
    }

    let mut messages = Vec::with_capacity(params.messages.len() + 1);
    if let Some(system) = &params.system {
        messages.push(Message {
            role: "system",
            content: Cow::Borrowed(system),
        });
    }
    messages.extend(params.messages.iter().map(convert_message));

    let temperature = if is_reasoning_model(&config.model) {
        if params.temperature.is_some() {
            tracing::debug!(model = %config.model, "dropping temperature for reasoning model");
        }
        None
    } else {
        params.temperature
    };

    let response_format = params
        .structured_output
        .as_ref()
        .map(|schema| match config.response_mode {
            ResponseMode::JsonSchema => ResponseFormat {
                format_type: "json_schema",
                json_schema: Some(JsonSchemaFormat {
                    name: "output",
                    schema: schema.as_value(),
                    strict: schema.is_strict_compatible(),
                }),
            },
            ResponseMode::JsonObject => ResponseFormat {
                format_type: "json_object",
                json_schema: None,
            },
        });

    Ok(Request {
        model: &config.model,
        messages,
        temperature,
        max_completion_tokens: params.max_tokens,
        seed: config.seed,
        response_format,
    })
}

fn convert_message(msg: &ChatMessage) -> Message<'_> {
    let role = match msg.role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    };
    Message {
        role,
        content: Cow::Owned(msg.text_content()),
    }
}

/// Reasoning models reject sampling parameters.
fn is_reasoning_model(model: &str) -> bool {
    ["o1", "o3", "o4"].iter().any(|p| model.starts_with(p))
}

// ── Response conversion ──────────────────────────────────────────────

/// Convert a Chat Completions response into a `ChatResponse`.
pub(crate) fn convert_response(resp: crate::types::Response) -> Result<ChatResponse, LlmError> {
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(LlmError::ResponseFormat {
            message: "OpenAI response contained no choices".into(),
            raw: String::new(),
        });
    };

    let mut content = Vec::new();
    if let Some(refusal) = choice.message.refusal {
        content.push(ContentBlock::Refusal(refusal));
    }
    if let Some(text) = choice.message.content {
        if !text.is_empty() {
            content.push(ContentBlock::Text(text));
        }
    }

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        reasoning_tokens: u.completion_tokens_details.and_then(|d| d.reasoning_tokens),
    });

    let stop_reason = choice
        .finish_reason
        .as_deref()
        .map_or(StopReason::EndTurn, convert_stop_reason);

    let mut metadata = HashMap::new();
    if let Some(id) = resp.id {
        metadata.insert("id".to_owned(), Value::String(id));
    }
    if let Some(fingerprint) = resp.system_fingerprint {
        metadata.insert("system_fingerprint".to_owned(), Value::String(fingerprint));
    }

    Ok(ChatResponse {
        content,
        usage,
        stop_reason,
        model: resp.model,
        metadata,
    })
}

/// Map `finish_reason` strings to `StopReason`.
pub(crate) fn convert_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        other => {
            tracing::warn!(finish_reason = other, "Unexpected OpenAI finish_reason");
            StopReason::EndTurn
        }
    }
}

// ── Error conversion ─────────────────────────────────────────────────

/// Convert an HTTP status and error body into an `LlmError`.
pub(crate) fn convert_error(status: http::StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<ErrorResponse>(body).ok();
    let message = detail.as_ref().map_or_else(
        || body.to_string(),
        |e| match &e.error.error_type {
            Some(kind) => format!("{kind}: {}", e.error.message),
            None => e.error.message.clone(),
        },
    );

    if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
        return LlmError::Auth(message);
    }

    if status == http::StatusCode::BAD_REQUEST {
        return LlmError::InvalidRequest(message);
    }

    if status == http::StatusCode::TOO_MANY_REQUESTS {
        if let Some(code) = detail.and_then(|d| d.error.code) {
            if code == "insufficient_quota" {
                return LlmError::Provider {
                    code,
                    message,
                    retryable: false,
                };
            }
        }
    }

    let retryable = matches!(status.as_u16(), 429 | 500 | 502 | 503);

    LlmError::Http {
        status: Some(status),
        message,
        retryable,
    }
}
