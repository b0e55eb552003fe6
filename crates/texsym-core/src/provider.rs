//! Provider trait and request types.
//!
//! Two abstractions live here:
//!
//! - **[`Provider`]**: implemented by every backend with native
//!   async-fn-in-traits (edition 2024).
//! - **[`DynProvider`]**: the object-safe mirror using boxed futures. A
//!   blanket `impl<T: Provider> DynProvider for T` bridges the two, which
//!   is how the pipeline stores whichever backend the factory built.
//!
//! Request configuration lives in [`ChatParams`]; a structured-output
//! request sets [`ChatParams::structured_output`] to a [`JsonSchema`].

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::{ChatMessage, ChatResponse};
use crate::error::LlmError;

/// The trait every LLM backend implements.
///
/// `Provider` is not object-safe; use [`DynProvider`] behind `dyn`.
pub trait Provider: Send + Sync {
    /// Sends one request and returns the complete response.
    fn generate(
        &self,
        params: &ChatParams,
    ) -> impl Future<Output = Result<ChatResponse, LlmError>> + Send;

    /// Returns static metadata describing this provider instance.
    fn metadata(&self) -> ProviderMetadata;
}

/// Object-safe counterpart of [`Provider`].
///
/// ```rust,no_run
/// use texsym_core::{ChatMessage, ChatParams, DynProvider};
///
/// async fn ask(provider: &dyn DynProvider, question: &str) -> Option<String> {
///     let params = ChatParams {
///         messages: vec![ChatMessage::user(question)],
///         ..Default::default()
///     };
///     provider.generate_boxed(&params).await.ok()?.text()
/// }
/// ```
pub trait DynProvider: Send + Sync {
    /// Boxed-future version of [`Provider::generate`].
    fn generate_boxed<'a>(
        &'a self,
        params: &'a ChatParams,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, LlmError>> + Send + 'a>>;

    /// Returns static metadata describing this provider instance.
    fn metadata(&self) -> ProviderMetadata;
}

impl<T: Provider> DynProvider for T {
    fn generate_boxed<'a>(
        &'a self,
        params: &'a ChatParams,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.generate(params))
    }

    fn metadata(&self) -> ProviderMetadata {
        Provider::metadata(self)
    }
}

/// Describes a provider instance: its name, model, and capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Provider name (e.g. `"openai"`).
    pub name: Cow<'static, str>,
    /// The model identifier.
    pub model: String,
    /// Maximum context window size in tokens.
    pub context_window: u64,
    /// What this provider instance supports.
    pub capabilities: HashSet<Capability>,
}

/// A feature a provider may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// JSON Schema–constrained output.
    StructuredOutput,
    /// Free-form JSON object output without a schema.
    JsonMode,
}

/// Parameters for one chat completion request.
///
/// ```rust
/// use texsym_core::{ChatMessage, ChatParams};
///
/// let params = ChatParams {
///     messages: vec![ChatMessage::user("Convert x^2")],
///     temperature: Some(0.0),
///     ..Default::default()
/// };
/// assert!(params.structured_output.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatParams {
    /// The conversation.
    pub messages: Vec<ChatMessage>,
    /// System prompt, for providers that accept it separately.
    pub system: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// JSON Schema the model's output must conform to.
    pub structured_output: Option<JsonSchema>,
    /// Per-request timeout. Skipped during serialization.
    #[serde(skip)]
    pub timeout: Option<Duration>,
    /// Provider-specific extras.
    pub metadata: HashMap<String, Value>,
}

/// A JSON Schema document used for structured output.
///
/// Wraps a [`serde_json::Value`]; validation uses the [`jsonschema`]
/// crate (feature `schema`, on by default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Derives a schema from a type implementing [`schemars::JsonSchema`].
    #[cfg(feature = "schema")]
    pub fn from_type<T: schemars::JsonSchema>() -> Result<Self, serde_json::Error> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(schema)?;
        Ok(Self(value))
    }

    /// Whether every declared property is required and no others are
    /// allowed. Providers with a strict schema mode only accept schemas
    /// of this shape at the top level.
    pub fn is_strict_compatible(&self) -> bool {
        let Some(props) = self.0.get("properties").and_then(Value::as_object) else {
            return false;
        };
        let required: HashSet<&str> = self
            .0
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let closed = self.0.get("additionalProperties") == Some(&Value::Bool(false));
        closed && props.keys().all(|k| required.contains(k.as_str()))
    }

    /// Validates `value` against this schema.
    ///
    /// Returns [`LlmError::SchemaValidation`] with every violation joined,
    /// or [`LlmError::InvalidRequest`] if the schema itself is malformed.
    #[cfg(feature = "schema")]
    pub fn validate(&self, value: &Value) -> Result<(), LlmError> {
        let validator = jsonschema::validator_for(&self.0)
            .map_err(|e| LlmError::InvalidRequest(format!("invalid JSON schema: {e}")))?;
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LlmError::SchemaValidation {
                message: errors.join("; "),
                schema: self.0.clone(),
                actual: value.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_schema() -> JsonSchema {
        JsonSchema::new(serde_json::json!({
            "type": "object",
            "properties": {
                "exprs": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["exprs"]
        }))
    }

    #[test]
    fn test_chat_params_defaults() {
        let p = ChatParams::default();
        assert!(p.messages.is_empty());
        assert!(p.system.is_none());
        assert!(p.structured_output.is_none());
        assert!(p.timeout.is_none());
    }

    #[test]
    fn test_chat_params_serde_skips_timeout() {
        let p = ChatParams {
            messages: vec![ChatMessage::user("hi")],
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: ChatParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timeout, None);
        assert_eq!(back.messages.len(), 1);
    }

    #[test]
    fn test_strict_compatible_requires_closed_object() {
        assert!(!object_schema().is_strict_compatible());

        let strict = JsonSchema::new(serde_json::json!({
            "type": "object",
            "properties": {"exprs": {"type": "array"}},
            "required": ["exprs"],
            "additionalProperties": false
        }));
        assert!(strict.is_strict_compatible());

        let optional_field = JsonSchema::new(serde_json::json!({
            "type": "object",
            "properties": {"exprs": {"type": "array"}, "notes": {"type": "string"}},
            "required": ["exprs"],
            "additionalProperties": false
        }));
        assert!(!optional_field.is_strict_compatible());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_validate_accepts_matching_value() {
        let value = serde_json::json!({"exprs": ["Eq(x, 1)"]});
        assert!(object_schema().validate(&value).is_ok());
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_validate_rejects_missing_field() {
        let err = object_schema()
            .validate(&serde_json::json!({"notes": "hi"}))
            .unwrap_err();
        assert!(matches!(err, LlmError::SchemaValidation { .. }));
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_validate_rejects_wrong_item_type() {
        let err = object_schema()
            .validate(&serde_json::json!({"exprs": [1, 2]}))
            .unwrap_err();
        assert!(matches!(err, LlmError::SchemaValidation { .. }));
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_validate_invalid_schema() {
        let schema = JsonSchema::new(serde_json::json!({"type": "bogus_not_a_type"}));
        let result = schema.validate(&serde_json::json!(42));
        assert!(matches!(result.unwrap_err(), LlmError::InvalidRequest(_)));
    }

    #[cfg(feature = "schema")]
    #[test]
    fn test_from_type_lists_properties() {
        #[derive(schemars::JsonSchema)]
        struct Envelope {
            #[allow(dead_code)]
            exprs: Vec<String>,
        }
        let schema = JsonSchema::from_type::<Envelope>().unwrap();
        let props = schema.as_value().get("properties").unwrap();
        assert!(props.get("exprs").is_some());
    }

    #[test]
    fn test_metadata_clone_eq() {
        let m = ProviderMetadata {
            name: "mock".into(),
            model: "test-model".into(),
            context_window: 128_000,
            capabilities: HashSet::from([Capability::StructuredOutput]),
        };
        assert_eq!(m, m.clone());
    }
}
