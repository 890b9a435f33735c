//! Structural violations of a machine definition.

use thiserror::Error;

/// A structural problem found while building a definition tree.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionViolation {
    #[error("Duplicate state id '{id}'")]
    DuplicateId { id: String },

    #[error("Initial state '{initial}' of '{state}' is not one of its children")]
    UnknownInitial { state: String, initial: String },

    #[error("Target '{target}' of '{event}' transition on '{state}' does not resolve")]
    UnresolvedTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("History state '{state}' must be a leaf directly inside a compound state")]
    MisplacedHistory { state: String },

    #[error("State '{state}' declares more than one history state")]
    MultipleHistory { state: String },

    #[error("Targets '{first}' and '{second}' of '{event}' transition on '{state}' are not in separate parallel regions")]
    ConflictingTargets {
        state: String,
        event: String,
        first: String,
        second: String,
    },

    #[error("Final state '{state}' cannot have child states")]
    FinalWithChildren { state: String },
}
