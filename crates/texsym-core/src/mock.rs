//! Mock provider for testing.
//!
//! [`MockProvider`] is a queue-based fake that lets tests control exactly
//! what a provider returns, without touching the network. Clones share
//! their queues and call log, so a test can keep one handle for
//! assertions while a [`MockFactory`](crate::test_helpers::MockFactory)
//! hands another to the code under test.
//!
//! # Usage
//!
//! ```rust,no_run
//! use texsym_core::mock::{MockError, MockProvider};
//! use texsym_core::test_helpers::{json_response, mock_for};
//! use texsym_core::{ChatParams, Provider};
//!
//! # async fn example() {
//! let mock = mock_for("openai", "gpt-4o-mini");
//! mock.queue_response(json_response(r#"{"exprs": ["x"]}"#));
//! mock.queue_error(MockError::Auth("bad key".into()));
//!
//! let resp = mock.generate(&ChatParams::default()).await.unwrap();
//! assert_eq!(mock.call_count(), 1);
//! # }
//! ```
//!
//! [`LlmError`] is not `Clone`, so queued failures are stored as
//! [`MockError`] and converted at dequeue time.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::chat::ChatResponse;
use crate::error::LlmError;
use crate::provider::{ChatParams, Provider, ProviderMetadata};

/// A queue-based mock provider for unit and integration tests.
///
/// Each `generate` call records its [`ChatParams`] and pops the front of
/// the queue.
///
/// # Panics
///
/// [`generate`](Provider::generate) panics if the queue is empty.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<ChatResponse, MockError>>>>,
    meta: ProviderMetadata,
    calls: Arc<Mutex<Vec<ChatParams>>>,
}

/// Cloneable mirror of the [`LlmError`] variants, for queuing.
#[derive(Debug, Clone)]
pub enum MockError {
    /// Maps to [`LlmError::Http`].
    Http {
        /// HTTP status code, if any.
        status: Option<http::StatusCode>,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`LlmError::Auth`].
    Auth(String),
    /// Maps to [`LlmError::InvalidRequest`].
    InvalidRequest(String),
    /// Maps to [`LlmError::Provider`].
    Provider {
        /// Provider error code.
        code: String,
        /// Error message.
        message: String,
        /// Whether the error is retryable.
        retryable: bool,
    },
    /// Maps to [`LlmError::Timeout`].
    Timeout {
        /// Elapsed milliseconds.
        elapsed_ms: u64,
    },
    /// Maps to [`LlmError::ResponseFormat`].
    ResponseFormat {
        /// What went wrong during decoding.
        message: String,
        /// The raw body.
        raw: String,
    },
}

impl MockError {
    fn into_llm_error(self) -> LlmError {
        match self {
            Self::Http {
                status,
                message,
                retryable,
            } => LlmError::Http {
                status,
                message,
                retryable,
            },
            Self::Auth(msg) => LlmError::Auth(msg),
            Self::InvalidRequest(msg) => LlmError::InvalidRequest(msg),
            Self::Provider {
                code,
                message,
                retryable,
            } => LlmError::Provider {
                code,
                message,
                retryable,
            },
            Self::Timeout { elapsed_ms } => LlmError::Timeout { elapsed_ms },
            Self::ResponseFormat { message, raw } => LlmError::ResponseFormat { message, raw },
        }
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queued = self.responses.lock().unwrap().len();
        let call_count = self.calls.lock().unwrap().len();
        f.debug_struct("MockProvider")
            .field("meta", &self.meta)
            .field("queued_responses", &queued)
            .field("recorded_calls", &call_count)
            .finish()
    }
}

impl MockProvider {
    /// Creates a new mock with the given metadata and an empty queue.
    pub fn new(meta: ProviderMetadata) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            meta,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Enqueues a successful response for the next `generate` call.
    pub fn queue_response(&self, response: ChatResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Enqueues an error for the next `generate` call.
    pub fn queue_error(&self, error: MockError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Every `ChatParams` passed to `generate`, in call order.
    pub fn recorded_calls(&self) -> Vec<ChatParams> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of queued responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Provider for MockProvider {
    async fn generate(&self, params: &ChatParams) -> Result<ChatResponse, LlmError> {
        self.calls.lock().unwrap().push(params.clone());
        let result = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockProvider: no queued responses remaining");
        result.map_err(MockError::into_llm_error)
    }

    fn metadata(&self) -> ProviderMetadata {
        self.meta.clone()
    }
}
