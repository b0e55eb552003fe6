//! Bounded retry with feedback.
//!
//! Each attempt builds a fresh prompt, sends it, and validates the
//! envelope. A retryable failure feeds the rejected output and error text
//! into the next attempt's prompt. The loop is an explicit state machine:
//!
//! ```text
//!  Attempting{n} ──ok──▶ Succeeded
//!       │
//!       └─err──▶ Failed{n} ──retryable && n < max──▶ Attempting{n+1}
//!                    │
//!                    └──otherwise──▶ Exhausted
//! ```

use texsym_core::usage::Usage;
use tracing::{debug, instrument};

use crate::diagnostics::FailureLog;
use crate::error::ConvertError;
use crate::prompt::{PriorFailure, PromptBuilder, PromptContext};
use crate::structured::{ExprEnvelope, Reply, StructuredClient};

/// Attempts made when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What the orchestrator is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRequest {
    /// The LaTeX to convert.
    pub latex: String,
    /// Caller-supplied context.
    pub extra_instructions: Option<String>,
    /// Names listed in the prompt.
    pub known_names: Vec<String>,
    /// Upper bound on provider calls. Must be at least 1.
    pub max_attempts: u32,
}

/// An envelope that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    /// The validated envelope.
    pub envelope: ExprEnvelope,
    /// The accepted raw output.
    pub raw: String,
    /// The prompt that produced it.
    pub prompt: String,
    /// Attempts used, from 1.
    pub attempts: u32,
    /// Tokens over all attempts.
    pub usage: Usage,
}

/// Orchestrator state.
#[derive(Debug)]
pub enum AttemptState {
    /// About to send attempt `attempt`.
    Attempting {
        /// Attempt number, from 1.
        attempt: u32,
        /// The previous attempt's rejection, if any.
        prior: Option<PriorFailure>,
    },
    /// Attempt `attempt` was rejected.
    Failed {
        /// Attempt number.
        attempt: u32,
        /// Why.
        error: ConvertError,
        /// The prompt that was sent.
        prompt: String,
    },
    /// Done.
    Succeeded(Accepted),
    /// Out of attempts, or a non-retryable error.
    Exhausted(ConvertError),
}

/// Rejects envelopes with no non-blank expression.
pub fn validate(reply: Reply) -> Result<Reply, ConvertError> {
    if reply.envelope.exprs.iter().all(|e| e.trim().is_empty()) {
        return Err(ConvertError::EmptyExpressions { raw: reply.raw });
    }
    Ok(reply)
}

/// Runs attempts until one succeeds or the budget is spent, returning
/// the last error in the latter case.
#[instrument(skip_all, fields(max_attempts = request.max_attempts))]
pub async fn convert_with_retry(
    client: &StructuredClient<'_>,
    builder: &PromptBuilder,
    request: &AttemptRequest,
    diagnostics: &mut FailureLog,
) -> Result<Accepted, ConvertError> {
    if request.max_attempts == 0 {
        return Err(ConvertError::InvalidConfig(
            "max_attempts must be at least 1".into(),
        ));
    }

    let mut usage = Usage::default();
    let mut state = AttemptState::Attempting {
        attempt: 1,
        prior: None,
    };

    loop {
        state = match state {
            AttemptState::Attempting { attempt, prior } => {
                let ctx = PromptContext {
                    latex: request.latex.clone(),
                    extra_instructions: request.extra_instructions.clone(),
                    known_names: request.known_names.clone(),
                    prior_failure: prior,
                };
                let prompt = builder.build(&ctx);
                debug!(attempt, "requesting expressions");

                let outcome = match client.request(&prompt).await {
                    Ok(response) => {
                        usage += &response.usage;
                        client.decode(response).and_then(validate)
                    }
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(reply) => AttemptState::Succeeded(Accepted {
                        envelope: reply.envelope,
                        raw: reply.raw,
                        prompt,
                        attempts: attempt,
                        usage: usage.clone(),
                    }),
                    Err(error) => AttemptState::Failed {
                        attempt,
                        error,
                        prompt,
                    },
                }
            }
            AttemptState::Failed {
                attempt,
                error,
                prompt,
            } => {
                let raw = error.raw_output().unwrap_or_default().to_owned();
                diagnostics.log_failure(&prompt, &raw, &error);
                if error.is_retryable() && attempt < request.max_attempts {
                    debug!(attempt, error = %error, "attempt rejected, retrying");
                    AttemptState::Attempting {
                        attempt: attempt + 1,
                        prior: Some(PriorFailure {
                            output: raw,
                            error: error.to_string(),
                        }),
                    }
                } else {
                    debug!(attempt, error = %error, "giving up");
                    AttemptState::Exhausted(error)
                }
            }
            AttemptState::Succeeded(accepted) => {
                debug!(attempts = accepted.attempts, "envelope accepted");
                return Ok(accepted);
            }
            AttemptState::Exhausted(error) => return Err(error),
        };
    }
}
