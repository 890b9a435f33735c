//! Checkpoint error types.

use thiserror::Error;

/// Errors raised while encoding, decoding or restoring a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Encoding the checkpoint as JSON failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    /// The input is not a well-formed checkpoint
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[source] serde_json::Error),

    /// The checkpoint was written in a format this build cannot read
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The checkpoint does not belong to the machine restoring it
    #[error("Checkpoint validation failed: {0}")]
    ValidationFailed(String),
}
