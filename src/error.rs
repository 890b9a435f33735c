//! Interpreter error types.

use crate::checkpoint::CheckpointError;
use crate::core::ActionError;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the interpreter.
///
/// The core never retries; recovery (replaying from an earlier snapshot,
/// resending the event) is up to the caller.
#[derive(Debug, Error)]
pub enum StatechartError {
    #[error("invalid state value: {reason}")]
    InvalidStateValue { reason: String },

    #[error("child state node '#{id}' does not exist on machine '{machine}'")]
    UnknownStateId { id: String, machine: String },

    #[error("macrostep did not settle within {limit} microsteps")]
    MaxStepsExceeded { limit: usize },

    #[error("guard '{guard}' failed: {source}")]
    GuardFailed {
        guard: String,
        #[source]
        source: ActionError,
    },

    #[error("action '{action}' failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: ActionError,
    },

    #[error("unhandled error event '{event}': {data}")]
    UnhandledErrorEvent { event: String, data: Value },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl StatechartError {
    pub(crate) fn invalid_value(reason: impl Into<String>) -> Self {
        StatechartError::InvalidStateValue {
            reason: reason.into(),
        }
    }

    /// Returns whether this error indicates the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns a stable identifier for this kind of error.
    pub fn error_code(&self) -> &'static str {
        match self {
            StatechartError::InvalidStateValue { .. } => "INVALID_STATE_VALUE",
            StatechartError::UnknownStateId { .. } => "UNKNOWN_STATE_ID",
            StatechartError::MaxStepsExceeded { .. } => "MAX_STEPS_EXCEEDED",
            StatechartError::GuardFailed { .. } => "GUARD_FAILED",
            StatechartError::ActionFailed { .. } => "ACTION_FAILED",
            StatechartError::UnhandledErrorEvent { .. } => "UNHANDLED_ERROR_EVENT",
            StatechartError::Checkpoint(_) => "CHECKPOINT",
        }
    }
}
