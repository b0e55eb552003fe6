//! Pre-built helpers for tests that drive the pipeline through a mock.
//!
//! Available with the `test-utils` feature so downstream crates can reuse
//! them, and always compiled for this crate's own tests.

use std::collections::{HashMap, HashSet};

use crate::chat::{ChatResponse, ContentBlock, StopReason};
use crate::error::LlmError;
use crate::factory::{ProviderConfig, ProviderFactory};
use crate::mock::MockProvider;
use crate::provider::{Capability, DynProvider, ProviderMetadata};
use crate::usage::Usage;

/// Builds a [`ChatResponse`] with a single text block.
pub fn sample_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::Text(text.into())],
        usage: sample_usage(),
        stop_reason: StopReason::EndTurn,
        model: "test-model".into(),
        metadata: HashMap::new(),
    }
}

/// Builds a response whose text is the given JSON document.
///
/// Identical to [`sample_response`]; the name documents intent at call
/// sites that feed envelopes to the pipeline.
pub fn json_response(json: &str) -> ChatResponse {
    sample_response(json)
}

/// Builds a response in which the model refused to answer.
pub fn refusal_response(message: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::Refusal(message.into())],
        ..sample_response("")
    }
}

/// Returns a [`Usage`] with 100 input / 50 output tokens.
pub fn sample_usage() -> Usage {
    Usage {
        input_tokens: 100,
        output_tokens: 50,
        reasoning_tokens: None,
    }
}

/// Creates a [`MockProvider`] advertising structured output.
pub fn mock_for(provider_name: &str, model: &str) -> MockProvider {
    MockProvider::new(ProviderMetadata {
        name: provider_name.to_owned().into(),
        model: model.into(),
        context_window: 128_000,
        capabilities: HashSet::from([Capability::StructuredOutput]),
    })
}

/// A [`ProviderFactory`] that hands out clones of one [`MockProvider`].
///
/// Requires an API key like a real backend, so credential handling is
/// exercised too. Every built provider shares the mock's queue.
#[derive(Debug, Clone)]
pub struct MockFactory {
    name: String,
    mock: MockProvider,
    models: Option<Vec<String>>,
}

impl MockFactory {
    /// A factory named `name` serving every model.
    pub fn new(name: impl Into<String>, mock: MockProvider) -> Self {
        Self {
            name: name.into(),
            mock,
            models: None,
        }
    }

    /// Restricts the models the factory claims to support.
    #[must_use]
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = Some(models.iter().map(|m| (*m).to_owned()).collect());
        self
    }

    /// The shared mock, for queuing and assertions.
    pub fn mock(&self) -> &MockProvider {
        &self.mock
    }
}

impl ProviderFactory for MockFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_model(&self, model: &str) -> bool {
        self.models
            .as_ref()
            .is_none_or(|models| models.iter().any(|m| m == model))
    }

    fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, LlmError> {
        if config.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(LlmError::Auth("mock factory requires an API key".into()));
        }
        Ok(Box::new(self.mock.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    #[test]
    fn test_sample_response_is_valid() {
        let r = sample_response("hello");
        assert_eq!(r.content, vec![ContentBlock::Text("hello".into())]);
        assert_eq!(r.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_refusal_response_has_no_text() {
        let r = refusal_response("no");
        assert!(r.text().is_none());
        assert_eq!(r.refusal(), Some("no"));
    }

    #[test]
    fn test_mock_for_helper() {
        let mock = mock_for("openai", "gpt-4o-mini");
        let meta = Provider::metadata(&mock);
        assert_eq!(meta.name, "openai");
        assert_eq!(meta.model, "gpt-4o-mini");
        assert!(meta.capabilities.contains(&Capability::StructuredOutput));
    }

    #[test]
    fn test_mock_factory_requires_key() {
        let factory = MockFactory::new("openai", mock_for("openai", "gpt-4o-mini"));
        let missing = ProviderConfig::new("openai", "gpt-4o-mini");
        assert!(matches!(factory.build(&missing), Err(LlmError::Auth(_))));

        let keyed = missing.api_key("sk-test");
        assert!(factory.build(&keyed).is_ok());
    }

    #[test]
    fn test_mock_factory_model_filter() {
        let factory = MockFactory::new("openai", mock_for("openai", "gpt-4o-mini"))
            .with_models(&["gpt-4o-mini"]);
        assert!(factory.supports_model("gpt-4o-mini"));
        assert!(!factory.supports_model("davinci"));
        assert_eq!(factory.name(), "openai");
    }
}
