//! # texsym
//!
//! LaTeX in, symbolic expression trees out.
//!
//! A language model is asked for a JSON envelope `{"exprs": [...]}` whose
//! strings are SymPy source. The reply is checked against a JSON Schema,
//! retried with feedback when it is malformed or empty, and each string
//! is parsed into an [`Expr`] against a registry of known names.
//!
//! ```text
//!  latex ─▶ PromptBuilder ─▶ StructuredClient ─▶ provider
//!                ▲                  │
//!                │   PriorFailure   ▼
//!                └──────────── retry (AttemptState)
//!                                   │ Accepted envelope
//!                                   ▼
//!                          ExpressionParser ◀── SymbolRegistry + locals
//!                                   │
//!                                   ▼
//!                    ConversionResult { parsed, failures }
//! ```
//!
//! A failed string never aborts the batch. [`ConvertError::SympyConversion`]
//! is raised only when none of the strings could be built.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use texsym::{BlockingConverter, ConvertOptions, ConverterConfig};
//!
//! let mut converter = BlockingConverter::openai(ConverterConfig::default())?;
//! converter.register_key("sk-...")?;
//! for expr in converter.to_sympy(r"\frac{d}{dx} f(x) = 2x", &ConvertOptions::default())? {
//!     println!("{expr}");
//! }
//! # Ok::<(), texsym::ConvertError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`registry`] | Names the parser accepts |
//! | [`prompt`] | Prompt text for one attempt |
//! | [`structured`] | One schema-constrained round-trip |
//! | [`retry`] | Bounded retry with feedback |
//! | [`parse`] | Envelope strings to trees, with partial success |
//! | [`diagnostics`] | Opt-in capture of failed attempts |

#![warn(missing_docs)]

#[cfg(feature = "blocking")]
mod blocking;
mod config;
mod converter;
mod error;

pub mod diagnostics;
pub mod parse;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod structured;

// ── Re-exports ─────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
pub use blocking::BlockingConverter;
pub use config::{ConvertOptions, ConverterConfig, Credentials};
pub use converter::{Conversion, Converter};
pub use diagnostics::{FailureLog, FailureRecord};
pub use error::ConvertError;
pub use parse::{ConversionResult, ExpressionParser, ParseFailure, ParserOptions};
pub use prompt::{PromptBuilder, PromptContext};
pub use registry::{ConflictPolicy, Entry, SymbolRegistry};
pub use retry::{AttemptState, DEFAULT_MAX_ATTEMPTS};
pub use structured::{ExprEnvelope, RequestOptions, StructuredClient};

pub use texsym_expr::{Arity, CallArgs, Definition, Expr, Kind, ParseError};
