//! Pipeline error type.
//!
//! Boundary failures ([`LlmError`]) are folded into
//! [`ConvertError::StructuredOutput`] and kept as its `source`. Only the
//! two response-shape variants are retried by the orchestrator; see
//! [`ConvertError::is_retryable`].

use texsym_core::LlmError;

use crate::parse::ParseFailure;

/// Errors returned by the conversion pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// No credential was registered before a conversion.
    #[error("no API key registered; call register_key() first")]
    ApiKeyMissing,

    /// The model's reply could not be obtained or decoded into an
    /// envelope: transport or provider failure, refusal, invalid JSON,
    /// or schema mismatch.
    #[error("structured output error: {message}")]
    StructuredOutput {
        /// What went wrong.
        message: String,
        /// The raw model output, when there was one.
        raw: Option<String>,
        /// The boundary error, when the failure came from the provider.
        #[source]
        source: Option<LlmError>,
    },

    /// The envelope was valid but held no usable expression.
    #[error("the model returned no expressions")]
    EmptyExpressions {
        /// The raw model output.
        raw: String,
    },

    /// Every returned string failed to build. Raised only when none
    /// succeeded; partial failures are reported in the result.
    #[error("none of {} expression(s) could be converted: {}", failures.len(), summarize(failures))]
    SympyConversion {
        /// One entry per returned string, in order.
        failures: Vec<ParseFailure>,
    },

    /// The configured provider does not match the factory.
    #[error("unsupported provider '{0}'")]
    UnsupportedProvider(String),

    /// The model cannot serve structured-output requests.
    #[error("model '{model}' does not support structured output on provider '{provider}'")]
    UnsupportedModel {
        /// Provider name.
        provider: String,
        /// Rejected model.
        model: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A registry entry is malformed.
    #[error("invalid registration of '{name}': {reason}")]
    InvalidRegistration {
        /// The name being registered.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The name is taken and the registry rejects replacements.
    #[error("name '{0}' is already registered")]
    NameConflict(String),

    /// The blocking runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

fn summarize(failures: &[ParseFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.index, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConvertError {
    /// Whether a fresh attempt with feedback may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StructuredOutput { .. } | Self::EmptyExpressions { .. }
        )
    }

    /// The raw model output attached to this error, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::StructuredOutput { raw, .. } => raw.as_deref(),
            Self::EmptyExpressions { raw } => Some(raw),
            _ => None,
        }
    }

    pub(crate) fn structured(message: impl Into<String>, raw: &str) -> Self {
        Self::StructuredOutput {
            message: message.into(),
            raw: Some(raw.to_owned()),
            source: None,
        }
    }

    /// Wraps a boundary error, attaching `raw` when the error has none.
    pub(crate) fn rejected(err: LlmError, raw: &str) -> Self {
        Self::StructuredOutput {
            message: err.to_string(),
            raw: Some(err.raw_output().unwrap_or(raw).to_owned()),
            source: Some(err),
        }
    }
}

impl From<LlmError> for ConvertError {
    fn from(err: LlmError) -> Self {
        Self::StructuredOutput {
            message: err.to_string(),
            raw: err.raw_output().map(str::to_owned),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texsym_expr::ParseError;

    #[test]
    fn test_retryable_classification() {
        assert!(ConvertError::structured("bad json", "{").is_retryable());
        assert!(ConvertError::EmptyExpressions { raw: "{}".into() }.is_retryable());
        assert!(!ConvertError::ApiKeyMissing.is_retryable());
        assert!(!ConvertError::SympyConversion { failures: vec![] }.is_retryable());
        assert!(!ConvertError::InvalidConfig("x".into()).is_retryable());
    }

    #[test]
    fn test_from_llm_error_keeps_source() {
        let err: ConvertError = LlmError::Auth("bad key".into()).into();
        assert!(err.is_retryable());
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("bad key"));
        assert_eq!(err.raw_output(), None);
    }

    #[test]
    fn test_rejected_attaches_raw() {
        let err = ConvertError::rejected(LlmError::InvalidRequest("nope".into()), "{\"a\":1}");
        assert_eq!(err.raw_output(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_sympy_conversion_message_lists_failures() {
        let err = ConvertError::SympyConversion {
            failures: vec![ParseFailure {
                index: 0,
                raw: "foo(x)".into(),
                error: ParseError::UnknownFunction("foo".into()),
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("none of 1"));
        assert!(msg.contains("[0] function 'foo' is not defined"));
    }
}
