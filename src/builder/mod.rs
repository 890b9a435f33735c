//! Builder API for machine definitions.
//!
//! Definitions are written with fluent builders and flattened into the
//! immutable [`StateTree`](crate::definition::StateTree) by
//! [`MachineBuilder::build`], which resolves every target and reports all
//! structural problems at once.
//!
//! # Example
//!
//! ```
//! use harel::builder::{MachineBuilder, StateNodeBuilder, TransitionBuilder};
//! use harel::core::Event;
//! use serde_json::{json, Value};
//!
//! let machine = MachineBuilder::new("fetch")
//!     .context(json!({ "hasPermission": true }))
//!     .initial("idle")
//!     .state(StateNodeBuilder::atomic("idle").on(
//!         "FETCH",
//!         TransitionBuilder::to("loading")
//!             .when(|ctx: &Value, _: &Event| ctx["hasPermission"] == true),
//!     ))
//!     .state(StateNodeBuilder::atomic("loading"))
//!     .build()
//!     .unwrap();
//!
//! assert!(machine.lookup_node_by_id("fetch.loading").is_ok());
//! ```

pub mod error;
pub mod machine;
pub mod state;
pub mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use state::StateNodeBuilder;
pub use transition::TransitionBuilder;

use crate::core::{Event, Guard};

/// A transition to `target` guarded by `predicate`.
///
/// # Example
///
/// ```
/// use harel::builder::guarded_transition;
/// use harel::core::Event;
///
/// let transition = guarded_transition("done", |count: &u32, _: &Event| *count > 3);
/// ```
pub fn guarded_transition<C, F>(target: impl Into<String>, predicate: F) -> TransitionBuilder<C>
where
    C: 'static,
    F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
{
    TransitionBuilder::to(target).guard(Guard::new(predicate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_transition_carries_guard() {
        let transition = guarded_transition("done", |count: &u32, _: &Event| *count > 3);

        assert_eq!(transition.targets, vec!["done"]);
        let guard = transition.guard.unwrap();
        assert!(guard.check(&4, &Event::new("TICK")).unwrap());
        assert!(!guard.check(&1, &Event::new("TICK")).unwrap());
    }
}
