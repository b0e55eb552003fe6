//! Unified error type for provider operations.
//!
//! Every backend maps its native failures into [`LlmError`], so the
//! pipeline can classify a failed round-trip without knowing which
//! service served it. Variants carry enough context for retry decisions
//! and for the diagnostics the pipeline records on failure.
//!
//! # Retryability
//!
//! Some variants carry a `retryable` flag that backends set from the
//! upstream response (HTTP 429, 503, ...):
//!
//! ```rust
//! use texsym_core::LlmError;
//!
//! let err = LlmError::Timeout { elapsed_ms: 5000 };
//! assert!(err.is_retryable());
//!
//! let err = LlmError::Auth("bad key".into());
//! assert!(!err.is_retryable());
//! ```

use serde_json::Value;

/// The error type returned by all provider operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    /// An HTTP-level failure (transport error, unexpected status code).
    ///
    /// `status` is `None` when no response was received at all.
    #[error("HTTP error (status={status:?}): {message}")]
    Http {
        /// The HTTP status code, if one was received.
        status: Option<http::StatusCode>,
        /// A human-readable description of the failure.
        message: String,
        /// Whether the request may succeed if sent again.
        retryable: bool,
    },

    /// The API key was rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The request was malformed (unknown model, bad parameters).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A provider-specific failure with no better mapping, including
    /// model refusals (`code = "refusal"`).
    #[error("Provider error ({code}): {message}")]
    Provider {
        /// Provider-defined error code.
        code: String,
        /// Human-readable error description.
        message: String,
        /// Whether the request may succeed if sent again.
        retryable: bool,
    },

    /// The response body could not be decoded.
    #[error("Response format error: {message}")]
    ResponseFormat {
        /// What went wrong during decoding.
        message: String,
        /// The raw body, for diagnostics.
        raw: String,
    },

    /// A structured-output value failed JSON Schema validation.
    #[error("Schema validation error: {message}")]
    SchemaValidation {
        /// Concatenated validation error messages.
        message: String,
        /// The schema the value was validated against.
        schema: Value,
        /// The value that failed validation.
        actual: Value,
    },

    /// The request exceeded its deadline.
    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },
}

impl LlmError {
    /// Returns `true` if the failure is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { retryable, .. } | Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// The raw text the provider returned, when the error carries one.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::ResponseFormat { raw, .. } if !raw.is_empty() => Some(raw),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::ResponseFormat {
            message: err.to_string(),
            raw: String::new(),
        }
    }
}
