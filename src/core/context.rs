//! The bound every machine context satisfies.
//!
//! Context is the extended state carried alongside the active configuration.
//! It is threaded through a microstep by value: guards borrow it, assignment
//! actions return a fresh value, and a snapshot's context is never mutated
//! after the snapshot has been handed out.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for machine context data.
///
/// Blanket-implemented for every type with the required capabilities, so
/// plain structs and `serde_json::Value` work without any ceremony.
///
/// # Required Traits
///
/// - `Clone`: each microstep derives a new context from the previous one
/// - `PartialEq`: snapshots are comparable, which makes determinism testable
/// - `Debug`: contexts show up in diagnostics
/// - `Serialize` + `DeserializeOwned`: contexts are persisted in checkpoints
///
/// # Example
///
/// ```rust
/// use harel::core::Context;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// struct Counter {
///     count: u32,
/// }
///
/// fn assert_context<C: Context>() {}
/// assert_context::<Counter>();
/// assert_context::<serde_json::Value>();
/// ```
pub trait Context:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Context for T where
    T: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}
