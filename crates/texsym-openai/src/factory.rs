//! Factory for building `OpenAI` providers from configuration.

use texsym_core::factory::{ProviderConfig, ProviderFactory};
use texsym_core::{DynProvider, LlmError};

use crate::config::ResponseMode;
use crate::{OpenAiConfig, OpenAiProvider};

/// Model families that accept `response_format: json_schema`.
const STRUCTURED_OUTPUT_PREFIXES: &[&str] = &["gpt-4o", "gpt-4.1", "gpt-5", "o1", "o3", "o4"];

/// Early o1 previews predate structured outputs.
const STRUCTURED_OUTPUT_EXCLUDED: &[&str] = &["o1-mini", "o1-preview"];

/// Whether `model` accepts JSON Schema constrained output.
pub fn supports_structured_output(model: &str) -> bool {
    STRUCTURED_OUTPUT_PREFIXES
        .iter()
        .any(|p| model.starts_with(p))
        && !STRUCTURED_OUTPUT_EXCLUDED
            .iter()
            .any(|p| model.starts_with(p))
}

/// Creates [`OpenAiProvider`]s from a [`ProviderConfig`].
///
/// # Configuration
///
/// | Field | Required | Description |
/// |-------|----------|-------------|
/// | `provider` | Yes | Must be `"openai"` |
/// | `api_key` | Yes | `OpenAI` API key |
/// | `model` | Yes | Model identifier (e.g. `"gpt-4o-mini"`) |
/// | `base_url` | No | Custom API endpoint |
/// | `timeout` | No | Request timeout |
/// | `extra.organization` | No | `OpenAI` organization ID |
/// | `extra.response_format` | No | `"json_schema"` (default) or `"json_object"` |
/// | `extra.seed` | No | Sampling seed |
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiFactory;

impl ProviderFactory for OpenAiFactory {
    fn name(&self) -> &str {
        "openai"
    }

    fn supports_model(&self, model: &str) -> bool {
        supports_structured_output(model)
    }

    fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::InvalidRequest("openai provider requires api_key".into()))?;

        if config.model.is_empty() {
            return Err(LlmError::InvalidRequest(
                "openai provider requires model".into(),
            ));
        }

        let response_mode = match config.get_extra_str("response_format") {
            None | Some("json_schema") => ResponseMode::JsonSchema,
            Some("json_object") => ResponseMode::JsonObject,
            Some(other) => {
                return Err(LlmError::InvalidRequest(format!(
                    "unknown response_format '{other}'"
                )));
            }
        };

        let mut openai_config = OpenAiConfig {
            api_key,
            model: config.model.clone(),
            response_mode,
            seed: config.extra.get("seed").and_then(serde_json::Value::as_i64),
            timeout: config.timeout,
            ..Default::default()
        };

        if let Some(base_url) = &config.base_url {
            openai_config.base_url.clone_from(base_url);
        }

        if let Some(organization) = config.get_extra_str("organization") {
            openai_config.organization = Some(organization.to_string());
        }

        Ok(Box::new(OpenAiProvider::new(openai_config)?))
    }
}
