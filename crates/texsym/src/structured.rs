//! One structured-output round-trip.
//!
//! The client declares the envelope schema on the request, then decodes
//! the reply: strip markdown fences, parse JSON, surface `{"error": ...}`
//! bodies, coerce a bare-string `exprs` into a list, validate against the
//! schema, deserialize. There is no retry here; that is the
//! orchestrator's job.

use std::time::Duration;

use schemars::JsonSchema as DeriveSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use texsym_core::usage::Usage;
use texsym_core::{ChatMessage, ChatParams, ChatResponse, DynProvider, JsonSchema};

use crate::error::ConvertError;

/// The JSON payload the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, DeriveSchema)]
pub struct ExprEnvelope {
    /// Candidate expressions in SymPy source syntax.
    pub exprs: Vec<String>,
    /// Free-form remarks from the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Whether the input held more than one equation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
}

/// Per-request settings passed to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// Sampling temperature. Defaults to `0.0`.
    pub temperature: Option<f32>,
    /// Output token cap.
    pub max_tokens: Option<u32>,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Optional system prompt.
    pub system: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: None,
            timeout: None,
            system: None,
        }
    }
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// The validated envelope.
    pub envelope: ExprEnvelope,
    /// The model's text exactly as received.
    pub raw: String,
    /// Tokens spent on this call.
    pub usage: Usage,
}

/// Sends prompts to a provider with the envelope schema attached.
pub struct StructuredClient<'a> {
    provider: &'a dyn DynProvider,
    schema: JsonSchema,
    options: RequestOptions,
}

impl<'a> StructuredClient<'a> {
    /// Creates a client. `provider` is `None` when no credential has been
    /// registered, which fails with [`ConvertError::ApiKeyMissing`].
    pub fn try_new(
        provider: Option<&'a dyn DynProvider>,
        options: RequestOptions,
    ) -> Result<Self, ConvertError> {
        let provider = provider.ok_or(ConvertError::ApiKeyMissing)?;
        Ok(Self {
            provider,
            schema: envelope_schema()?,
            options,
        })
    }

    /// The schema sent with every request.
    pub fn schema(&self) -> &JsonSchema {
        &self.schema
    }

    /// One round-trip: request, then decode.
    pub async fn send(&self, prompt: &str) -> Result<Reply, ConvertError> {
        let response = self.request(prompt).await?;
        self.decode(response)
    }

    /// Sends `prompt` and returns the raw provider response.
    pub async fn request(&self, prompt: &str) -> Result<ChatResponse, ConvertError> {
        let params = ChatParams {
            messages: vec![ChatMessage::user(prompt)],
            system: self.options.system.clone(),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            structured_output: Some(self.schema.clone()),
            timeout: self.options.timeout,
            ..Default::default()
        };
        Ok(self.provider.generate_boxed(&params).await?)
    }

    /// Turns a provider response into a validated [`Reply`].
    pub fn decode(&self, response: ChatResponse) -> Result<Reply, ConvertError> {
        if let Some(refusal) = response.refusal() {
            return Err(ConvertError::structured(
                format!("model refused: {refusal}"),
                refusal,
            ));
        }
        let Some(raw) = response.text() else {
            return Err(ConvertError::structured(
                "model returned no text content",
                "",
            ));
        };
        let envelope = decode_envelope(&raw, &self.schema)?;
        Ok(Reply {
            envelope,
            raw,
            usage: response.usage,
        })
    }
}

/// The JSON Schema of [`ExprEnvelope`].
pub fn envelope_schema() -> Result<JsonSchema, ConvertError> {
    JsonSchema::from_type::<ExprEnvelope>()
        .map_err(|e| ConvertError::InvalidConfig(format!("cannot derive envelope schema: {e}")))
}

/// Removes a surrounding markdown code fence, with or without a language
/// tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decodes and validates `raw` into an envelope.
pub fn decode_envelope(raw: &str, schema: &JsonSchema) -> Result<ExprEnvelope, ConvertError> {
    let body = strip_code_fences(raw);
    let mut value: Value = serde_json::from_str(body)
        .map_err(|e| ConvertError::structured(format!("invalid JSON: {e}"), raw))?;

    if value.get("exprs").is_none() {
        if let Some(err) = value.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| err.as_str())
                .unwrap_or("unknown");
            return Err(ConvertError::structured(
                format!("provider reported an error: {message}"),
                raw,
            ));
        }
    }

    if let Some(exprs) = value.get_mut("exprs") {
        if exprs.is_string() {
            tracing::debug!("coercing string exprs into a list");
            *exprs = Value::Array(vec![exprs.take()]);
        }
    }

    schema
        .validate(&value)
        .map_err(|e| ConvertError::rejected(e, raw))?;
    serde_json::from_value(value)
        .map_err(|e| ConvertError::structured(format!("invalid envelope: {e}"), raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use texsym_core::mock::MockError;
    use texsym_core::test_helpers::{json_response, mock_for, refusal_response};

    fn schema() -> JsonSchema {
        envelope_schema().unwrap()
    }

    #[test]
    fn test_schema_requires_only_exprs() {
        let schema = schema();
        let required = schema.as_value()["required"].as_array().unwrap().clone();
        assert_eq!(required, vec![Value::from("exprs")]);
        assert!(!schema.is_strict_compatible());
    }

    #[test]
    fn test_decode_full_envelope() {
        let env = decode_envelope(
            r#"{"exprs": ["Eq(x, 1)"], "notes": "n", "multiple": false}"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(env.exprs, vec!["Eq(x, 1)".to_string()]);
        assert_eq!(env.notes.as_deref(), Some("n"));
        assert_eq!(env.multiple, Some(false));
    }

    #[test]
    fn test_decode_strips_fences() {
        let raw = "```json\n{\"exprs\": [\"x\"]}\n```";
        assert_eq!(decode_envelope(raw, &schema()).unwrap().exprs, vec!["x"]);
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_decode_coerces_string_exprs() {
        let env = decode_envelope(r#"{"exprs": "Eq(x, 1)"}"#, &schema()).unwrap();
        assert_eq!(env.exprs, vec!["Eq(x, 1)"]);
    }

    #[test]
    fn test_decode_rejects_missing_exprs() {
        let err = decode_envelope(r#"{"notes": "x"}"#, &schema()).unwrap_err();
        assert!(matches!(err, ConvertError::StructuredOutput { .. }));
        assert_eq!(err.raw_output(), Some(r#"{"notes": "x"}"#));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_envelope("Eq(x, 1)", &schema()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_decode_surfaces_error_body() {
        let err = decode_envelope(r#"{"error": {"message": "blocked"}}"#, &schema()).unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[test]
    fn test_decode_allows_empty_list() {
        let env = decode_envelope(r#"{"exprs": []}"#, &schema()).unwrap();
        assert!(env.exprs.is_empty());
    }

    #[test]
    fn test_try_new_without_provider() {
        let err = StructuredClient::try_new(None, RequestOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ConvertError::ApiKeyMissing));
    }

    #[tokio::test]
    async fn test_send_declares_schema() {
        let mock = mock_for("openai", "gpt-4o-mini");
        mock.queue_response(json_response(r#"{"exprs": ["x + 1"]}"#));
        let client = StructuredClient::try_new(Some(&mock), RequestOptions::default()).unwrap();

        let reply = client.send("convert x+1").await.unwrap();
        assert_eq!(reply.envelope.exprs, vec!["x + 1"]);
        assert_eq!(reply.raw, r#"{"exprs": ["x + 1"]}"#);
        assert_eq!(reply.usage.input_tokens, 100);

        let calls = mock.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].structured_output.as_ref(), Some(client.schema()));
        assert_eq!(calls[0].temperature, Some(0.0));
        assert_eq!(calls[0].messages[0].text_content(), "convert x+1");
    }

    #[tokio::test]
    async fn test_send_maps_refusal() {
        let mock = mock_for("openai", "gpt-4o-mini");
        mock.queue_response(refusal_response("I can't help with that"));
        let client = StructuredClient::try_new(Some(&mock), RequestOptions::default()).unwrap();
        let err = client.send("p").await.unwrap_err();
        assert!(matches!(err, ConvertError::StructuredOutput { .. }));
        assert!(err.to_string().contains("refused"));
    }

    #[tokio::test]
    async fn test_send_wraps_provider_errors() {
        let mock = mock_for("openai", "gpt-4o-mini");
        mock.queue_error(MockError::Auth("bad key".into()));
        let client = StructuredClient::try_new(Some(&mock), RequestOptions::default()).unwrap();
        let err = client.send("p").await.unwrap_err();
        let ConvertError::StructuredOutput { source, .. } = err else {
            panic!("expected StructuredOutput");
        };
        assert!(matches!(source, Some(texsym_core::LlmError::Auth(_))));
    }
}
