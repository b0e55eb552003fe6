//! Building providers from configuration.
//!
//! The pipeline never names a concrete backend. It holds a
//! [`ProviderFactory`] and a [`ProviderConfig`], and asks the factory for
//! a fresh [`DynProvider`] whenever the credential changes.
//!
//! ```rust,ignore
//! use texsym_core::{DynProvider, LlmError, ProviderConfig, ProviderFactory};
//!
//! struct MyFactory;
//!
//! impl ProviderFactory for MyFactory {
//!     fn name(&self) -> &str { "my-provider" }
//!
//!     fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, LlmError> {
//!         // construct the backend from `config`
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::LlmError;
use crate::provider::DynProvider;

/// Backend-neutral provider configuration.
///
/// Provider-specific options go in [`extra`](Self::extra). `Debug` output
/// redacts the API key.
#[derive(Clone, Default)]
pub struct ProviderConfig {
    /// Provider name (e.g. `"openai"`).
    pub provider: String,
    /// API key for authenticated providers.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Custom base URL for the API endpoint.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Provider-specific options; each backend documents its keys.
    pub extra: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("extra", &self.extra)
            .finish()
    }
}

impl ProviderConfig {
    /// Creates a config for the given provider and model.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a provider-specific option.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Gets a string option from [`extra`](Self::extra).
    pub fn get_extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

/// Creates providers of one backend from configuration.
pub trait ProviderFactory: Send + Sync {
    /// The provider name this factory serves (lowercase, e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Whether `model` can serve structured-output requests on this
    /// backend. Checked once, when a converter is configured.
    fn supports_model(&self, model: &str) -> bool {
        let _ = model;
        true
    }

    /// Creates a provider instance.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields (such as the API key) are
    /// missing or the transport cannot be constructed.
    fn build(&self, config: &ProviderConfig) -> Result<Box<dyn DynProvider>, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ProviderConfig::new("openai", "gpt-4o-mini")
            .api_key("sk-test")
            .base_url("http://localhost:8080/v1")
            .timeout(Duration::from_secs(5))
            .extra("response_format", "json_object");
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.get_extra_str("response_format"), Some("json_object"));
        assert_eq!(config.get_extra_str("missing"), None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig::new("openai", "gpt-4o-mini").api_key("sk-secret-123");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_supports_model_default_accepts_all() {
        struct Any;
        impl ProviderFactory for Any {
            fn name(&self) -> &str {
                "any"
            }
            fn build(&self, _config: &ProviderConfig) -> Result<Box<dyn DynProvider>, LlmError> {
                Err(LlmError::InvalidRequest("unused".into()))
            }
        }
        assert!(Any.supports_model("whatever"));
        assert!(Any.build(&ProviderConfig::default()).is_err());
    }
}
