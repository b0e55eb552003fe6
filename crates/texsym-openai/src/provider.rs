//! `OpenAI` `Provider` implementation.

use std::collections::HashSet;

use reqwest::header::{HeaderMap, HeaderValue};
use texsym_core::ChatResponse;
use texsym_core::error::LlmError;
use texsym_core::provider::{Capability, ChatParams, Provider, ProviderMetadata};
use tracing::instrument;

use crate::config::OpenAiConfig;
use crate::convert;
use crate::factory::supports_structured_output;

/// `OpenAI` Chat Completions provider.
///
/// ```rust,no_run
/// use texsym_core::{ChatMessage, ChatParams, Provider};
/// use texsym_openai::{OpenAiConfig, OpenAiProvider};
///
/// # async fn example() -> Result<(), texsym_core::LlmError> {
/// let provider = OpenAiProvider::new(OpenAiConfig {
///     api_key: std::env::var("OPENAI_API_KEY").unwrap(),
///     ..Default::default()
/// })?;
///
/// let response = provider
///     .generate(&ChatParams {
///         messages: vec![ChatMessage::user("Reply with the JSON {\"ok\": true}")],
///         ..Default::default()
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a provider from configuration.
    ///
    /// Reuses `config.client` when given; otherwise builds a client with
    /// the configured timeout.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Auth("OpenAI API key is empty".into()));
        }
        let client = match config.client.clone() {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build().map_err(|e| {
                    LlmError::InvalidRequest(format!("failed to build HTTP client: {e}"))
                })?
            }
        };
        Ok(Self { config, client })
    }

    fn default_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            "authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|_| LlmError::Auth("API key contains invalid header characters".into()))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        if let Some(org) = &self.config.organization {
            headers.insert(
                "openai-organization",
                HeaderValue::from_str(org).map_err(|_| {
                    LlmError::InvalidRequest(
                        "Organization ID contains invalid header characters".into(),
                    )
                })?,
            );
        }

        Ok(headers)
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    async fn send_request(&self, params: &ChatParams) -> Result<String, LlmError> {
        let request_body = convert::build_request(params, &self.config)?;

        let mut req = self
            .client
            .post(self.completions_url())
            .headers(self.default_headers()?)
            .json(&request_body);

        if let Some(timeout) = params.timeout {
            req = req.timeout(timeout);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    elapsed_ms: params
                        .timeout
                        .or(self.config.timeout)
                        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                }
            } else {
                LlmError::Http {
                    status: e.status().map(|s| {
                        http::StatusCode::from_u16(s.as_u16())
                            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
                    }),
                    message: e.to_string(),
                    retryable: e.is_connect(),
                }
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::ResponseFormat {
            message: format!("Failed to read OpenAI response body: {e}"),
            raw: String::new(),
        })?;

        if !status.is_success() {
            let http_status = http::StatusCode::from_u16(status.as_u16())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
            return Err(convert::convert_error(http_status, &body));
        }

        Ok(body)
    }
}

impl Provider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate(&self, params: &ChatParams) -> Result<ChatResponse, LlmError> {
        let body = self.send_request(params).await?;

        let api_response: crate::types::Response =
            serde_json::from_str(&body).map_err(|e| LlmError::ResponseFormat {
                message: format!("Failed to parse OpenAI response: {e}"),
                raw: body,
            })?;

        convert::convert_response(api_response)
    }

    fn metadata(&self) -> ProviderMetadata {
        let mut capabilities = HashSet::from([Capability::JsonMode]);
        if supports_structured_output(&self.config.model) {
            capabilities.insert(Capability::StructuredOutput);
        }

        ProviderMetadata {
            name: "openai".into(),
            model: self.config.model.clone(),
            context_window: context_window_for_model(&self.config.model),
            capabilities,
        }
    }
}

fn context_window_for_model(model: &str) -> u64 {
    if model.starts_with("gpt-4.1") {
        1_047_576
    } else if model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4") {
        200_000
    } else if model.starts_with("gpt-3.5") {
        16_385
    } else {
        128_000
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn provider(config: OpenAiConfig) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiConfig {
            api_key: "sk-test123".into(),
            ..config
        })
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let err = OpenAiProvider::new(OpenAiConfig::default()).unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[test]
    fn test_metadata() {
        let meta = provider(OpenAiConfig::default()).metadata();
        assert_eq!(meta.name, "openai");
        assert_eq!(meta.model, "gpt-4o-mini");
        assert_eq!(meta.context_window, 128_000);
        assert!(meta.capabilities.contains(&Capability::StructuredOutput));
    }

    #[test]
    fn test_metadata_legacy_model_json_mode_only() {
        let meta = provider(OpenAiConfig {
            model: "gpt-3.5-turbo".into(),
            ..Default::default()
        })
        .metadata();
        assert!(!meta.capabilities.contains(&Capability::StructuredOutput));
        assert!(meta.capabilities.contains(&Capability::JsonMode));
        assert_eq!(meta.context_window, 16_385);
    }

    #[test]
    fn test_completions_url_trailing_slash() {
        let p = provider(OpenAiConfig {
            base_url: "https://proxy.example.com/v1/".into(),
            ..Default::default()
        });
        assert_eq!(
            p.completions_url(),
            "https://proxy.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_default_headers() {
        let p = provider(OpenAiConfig {
            organization: Some("org-abc".into()),
            ..Default::default()
        });
        let headers = p.default_headers().unwrap();

        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test123");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("openai-organization").unwrap(), "org-abc");
    }

    #[test]
    fn test_default_headers_invalid_key() {
        let p = OpenAiProvider::new(OpenAiConfig {
            api_key: "invalid\nkey".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(p.default_headers().unwrap_err(), LlmError::Auth(_)));
    }

    #[test]
    fn test_new_with_custom_client_and_timeout() {
        let custom_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        let p = provider(OpenAiConfig {
            client: Some(custom_client),
            timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        assert_eq!(p.metadata().name, "openai");
    }
}
