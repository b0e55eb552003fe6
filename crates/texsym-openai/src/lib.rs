//! `OpenAI` backend for texsym.
//!
//! Implements [`Provider`](texsym_core::Provider) over the Chat
//! Completions API, restricted to what the conversion pipeline needs:
//! plain-text messages in, one JSON document out. Structured output is
//! requested with `response_format`, either as a JSON Schema (the
//! default) or in the older JSON-object mode.
//!
//! ```rust,no_run
//! use texsym_openai::{OpenAiConfig, OpenAiProvider};
//!
//! let provider = OpenAiProvider::new(OpenAiConfig {
//!     api_key: std::env::var("OPENAI_API_KEY").unwrap(),
//!     ..Default::default()
//! })
//! .unwrap();
//! ```

#![warn(missing_docs)]

mod config;
mod convert;
mod factory;
mod provider;
mod types;

pub use config::{OpenAiConfig, ResponseMode};
pub use factory::{OpenAiFactory, supports_structured_output};
pub use provider::OpenAiProvider;
