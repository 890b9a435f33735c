//! Build errors for machine definitions.

use crate::validation::DefinitionViolation;
use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial context not specified. Call .context(value) or .context_factory(f) before .build()")]
    MissingContext,

    #[error("Invalid definition: {}", format_violations(.0))]
    InvalidDefinition(Vec<DefinitionViolation>),
}

impl BuildError {
    /// Every violation found, empty for other errors.
    pub fn violations(&self) -> &[DefinitionViolation] {
        match self {
            BuildError::InvalidDefinition(violations) => violations,
            BuildError::MissingContext => &[],
        }
    }
}

fn format_violations(violations: &[DefinitionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
