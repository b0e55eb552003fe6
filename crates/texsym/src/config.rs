//! Converter and per-call configuration.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use serde_json::Value;
use texsym_core::ProviderConfig;
use texsym_expr::Expr;

use crate::error::ConvertError;
use crate::parse::ParserOptions;
use crate::prompt::PromptBuilder;
use crate::registry::ConflictPolicy;
use crate::retry::DEFAULT_MAX_ATTEMPTS;
use crate::structured::RequestOptions;

/// Construction-time settings for a [`Converter`](crate::Converter).
///
/// ```rust
/// use texsym::ConverterConfig;
///
/// let config = ConverterConfig {
///     model: "gpt-4o".into(),
///     max_attempts: 5,
///     ..Default::default()
/// };
/// assert_eq!(config.provider, "openai");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Provider name; must match the factory.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Initial credential. Can also be set later with `register_key`.
    pub api_key: Option<String>,
    /// Custom endpoint.
    pub base_url: Option<String>,
    /// Transport timeout.
    pub timeout: Option<Duration>,
    /// Provider-specific options, passed through to the factory.
    pub extra: HashMap<String, Value>,
    /// Default attempt budget per call.
    pub max_attempts: u32,
    /// What re-registering a name does.
    pub conflict_policy: ConflictPolicy,
    /// Per-request settings.
    pub request: RequestOptions,
    /// Parser switches.
    pub parser: ParserOptions,
    /// Prompt template.
    pub prompt: PromptBuilder,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            base_url: None,
            timeout: None,
            extra: HashMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            conflict_policy: ConflictPolicy::default(),
            request: RequestOptions::default(),
            parser: ParserOptions::default(),
            prompt: PromptBuilder::default(),
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("extra", &self.extra)
            .field("max_attempts", &self.max_attempts)
            .field("conflict_policy", &self.conflict_policy)
            .field("request", &self.request)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl ConverterConfig {
    /// Checks values that do not depend on the factory.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.provider.is_empty() {
            return Err(ConvertError::InvalidConfig("provider must not be empty".into()));
        }
        if self.model.is_empty() {
            return Err(ConvertError::InvalidConfig("model must not be empty".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.api_key.as_deref().is_some_and(str::is_empty) {
            return Err(ConvertError::InvalidConfig("api_key must not be empty".into()));
        }
        Ok(())
    }

    /// The factory-facing configuration, using `credentials` for the key.
    pub fn provider_config(&self, credentials: &Credentials) -> ProviderConfig {
        let mut config = ProviderConfig::new(&self.provider, &self.model);
        config.api_key = credentials.expose().map(str::to_owned);
        config.base_url.clone_from(&self.base_url);
        config.timeout = self.timeout;
        config.extra.clone_from(&self.extra);
        config
    }
}

/// A per-converter API key. `Debug` never prints it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    api_key: Option<String>,
}

impl Credentials {
    /// Wraps `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
        }
    }

    /// Whether a key is present.
    pub fn is_set(&self) -> bool {
        self.api_key.is_some()
    }

    /// The key itself.
    pub fn expose(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Per-call options for `to_sympy` and `convert`.
///
/// ```rust
/// use texsym::{ConvertOptions, Expr};
///
/// let options = ConvertOptions::default()
///     .with_instructions("u is a velocity field")
///     .with_local("c", Expr::symbol("c_0"))
///     .with_failure_logs(true);
/// assert_eq!(options.max_attempts, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    /// Context for the model, placed in the prompt.
    pub extra_instructions: Option<String>,
    /// Overrides the converter's attempt budget.
    pub max_attempts: Option<u32>,
    /// Capture every failed attempt and parse failure.
    pub failure_logs: bool,
    /// Bindings that shadow everything else for this call.
    pub locals: BTreeMap<String, Expr>,
}

impl ConvertOptions {
    /// Sets the model context.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.extra_instructions = Some(instructions.into());
        self
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Turns failure capture on or off.
    #[must_use]
    pub fn with_failure_logs(mut self, enabled: bool) -> Self {
        self.failure_logs = enabled;
        self
    }

    /// Binds `name` for this call.
    #[must_use]
    pub fn with_local(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.locals.insert(name.into(), value);
        self
    }
}
