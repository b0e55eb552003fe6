//! Failure capture for one conversion.

use std::fmt::Display;

/// One captured failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Position within the invocation, from 1.
    pub seq: usize,
    /// The exact prompt sent.
    pub prompt: String,
    /// The exact model output (empty when none came back).
    pub raw_output: String,
    /// The error text.
    pub error: String,
}

/// Collects [`FailureRecord`]s when enabled; a no-op otherwise.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    enabled: bool,
    records: Vec<FailureRecord>,
}

impl FailureLog {
    /// A log that records only when `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            records: Vec::new(),
        }
    }

    /// Whether failures are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records a failure and emits a warning. Does nothing when disabled.
    pub fn log_failure(&mut self, prompt: &str, raw_output: &str, error: &dyn Display) {
        if !self.enabled {
            return;
        }
        let seq = self.records.len() + 1;
        let error = error.to_string();
        tracing::warn!(
            seq,
            error = %error,
            raw_output,
            prompt_len = prompt.len(),
            "conversion failure"
        );
        self.records.push(FailureRecord {
            seq,
            prompt: prompt.to_owned(),
            raw_output: raw_output.to_owned(),
            error,
        });
    }

    /// Records so far.
    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    /// Consumes the log.
    pub fn into_records(self) -> Vec<FailureRecord> {
        self.records
    }
}
