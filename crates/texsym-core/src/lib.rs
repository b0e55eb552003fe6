//! # texsym-core
//!
//! The provider boundary of the texsym pipeline.
//!
//! texsym turns LaTeX into symbolic expressions by asking a language model
//! for a constrained JSON envelope. Everything that touches the model goes
//! through the small vocabulary defined here: request parameters, the
//! response shape, a unified error type, and the [`Provider`] trait that
//! backends implement. Backend crates (currently `texsym-openai`) depend on
//! this crate; the pipeline crate `texsym` only ever sees [`DynProvider`].
//!
//! # Architecture
//!
//! ```text
//!  ┌─────────────────┐        ┌─────────────────┐
//!  │  texsym-openai  │        │   texsym-expr   │
//!  └────────┬────────┘        └────────┬────────┘
//!           │                          │
//!           ▼                          │
//!  ┌─────────────────┐                 │
//!  │   texsym-core   │  ← you are here │
//!  └────────┬────────┘                 │
//!           │                          │
//!           └────────────┬─────────────┘
//!                        ▼
//!               ┌─────────────────┐
//!               │     texsym      │
//!               └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chat`] | Messages, content blocks, and responses |
//! | [`error`] | Unified [`LlmError`] across backends |
//! | [`factory`] | Building providers from a [`ProviderConfig`] |
//! | [`provider`] | The [`Provider`] trait, request parameters, JSON Schema |
//! | [`usage`] | Token counts |

#![warn(missing_docs)]

pub mod chat;
pub mod error;
pub mod factory;
pub mod provider;
pub mod usage;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

// ── Re-exports ─────────────────────────────────────────────────────

pub use chat::{ChatMessage, ChatResponse, ChatRole, ContentBlock, StopReason};
pub use error::LlmError;
pub use factory::{ProviderConfig, ProviderFactory};
pub use provider::{Capability, ChatParams, DynProvider, JsonSchema, Provider, ProviderMetadata};
pub use usage::Usage;
