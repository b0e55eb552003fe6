//! `OpenAI` provider configuration.

use std::time::Duration;

/// How the request asks for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// `response_format: {"type": "json_schema", ...}` carrying the
    /// request's schema. Strict when the schema allows it.
    #[default]
    JsonSchema,
    /// `response_format: {"type": "json_object"}`. The schema is only
    /// enforced locally; the prompt must mention JSON.
    JsonObject,
}

/// Configuration for the `OpenAI` provider.
///
/// ```rust
/// use texsym_openai::OpenAiConfig;
///
/// let config = OpenAiConfig {
///     api_key: "sk-...".into(),
///     model: "gpt-4o".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct OpenAiConfig {
    /// `OpenAI` API key. Required.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Base URL for the API. Override for proxies or compatible servers.
    pub base_url: String,
    /// Optional organization ID.
    pub organization: Option<String>,
    /// How JSON output is requested.
    pub response_mode: ResponseMode,
    /// Sampling seed, for best-effort reproducible answers.
    pub seed: Option<i64>,
    /// Request timeout. `None` uses reqwest's default.
    pub timeout: Option<Duration>,
    /// Pre-configured HTTP client to reuse.
    pub client: Option<reqwest::Client>,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("response_mode", &self.response_mode)
            .field("seed", &self.seed)
            .field("timeout", &self.timeout)
            .field("client", &self.client.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            organization: None,
            response_mode: ResponseMode::default(),
            seed: None,
            timeout: None,
            client: None,
        }
    }
}
