//! Builder for transitions.

use crate::core::{Action, Event, Guard};

/// Builder for a transition with a fluent API.
///
/// Targets are strings resolved when the machine is built:
/// - `"sibling"` or `"sibling.child"`: relative to the source's parent
/// - `".child"`: relative to the source itself
/// - `"#id"`: any node by id
pub struct TransitionBuilder<C> {
    pub(crate) targets: Vec<String>,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) actions: Vec<Action<C>>,
    pub(crate) internal: bool,
}

impl<C> TransitionBuilder<C> {
    /// A targetless transition.
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            guard: None,
            actions: Vec::new(),
            internal: false,
        }
    }

    /// A transition to `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self::new().target(target)
    }

    /// A transition that runs its actions without changing state.
    pub fn targetless() -> Self {
        Self::new()
    }

    /// Add a target. Several targets must lie in different parallel regions.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Add a guard predicate (optional).
    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Append an action.
    pub fn action(mut self, action: Action<C>) -> Self {
        self.actions.push(action);
        self
    }

    /// Append several actions, kept in order.
    pub fn actions(mut self, actions: impl IntoIterator<Item = Action<C>>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Keep a compound source active when every target is its descendant.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

impl<C: 'static> TransitionBuilder<C> {
    /// Add a guard using a closure (optional).
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }
}

impl<C> Default for TransitionBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
