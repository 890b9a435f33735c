//! Guard predicates for controlling transitions.
//!
//! Guards are boolean functions of the current context and the event being
//! processed. They must be free of side effects: the selector may evaluate
//! a guard more than once, and `transition_candidates` never evaluates them.

use super::action::ActionError;
use super::event::Event;
use std::fmt;
use std::sync::Arc;

/// Type alias for guard predicate functions.
pub type GuardPredicate<C> = Arc<dyn Fn(&C, &Event) -> Result<bool, ActionError> + Send + Sync>;

/// Named predicate that determines if a transition is enabled.
///
/// A guard that returns an error aborts the macrostep in progress; the error
/// surfaces as [`StatechartError::GuardFailed`](crate::StatechartError::GuardFailed).
///
/// # Example
///
/// ```rust
/// use harel::core::{Event, Guard};
/// use serde_json::{json, Value};
///
/// let has_permission = Guard::named("hasPermission", |ctx: &Value, _event: &Event| {
///     ctx["hasPermission"] == true
/// });
///
/// let ping = Event::new("PING");
/// assert!(has_permission.check(&json!({ "hasPermission": true }), &ping).unwrap());
/// assert!(!has_permission.check(&json!({ "hasPermission": false }), &ping).unwrap());
/// ```
pub struct Guard<C> {
    name: String,
    predicate: GuardPredicate<C>,
}

impl<C: 'static> Guard<C> {
    /// Create an anonymous guard from an infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
    {
        Self::named("inline", predicate)
    }

    /// Create a named guard from an infallible predicate.
    pub fn named<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(move |ctx, event| Ok(predicate(ctx, event))),
        }
    }

    /// Create a named guard whose evaluation can fail.
    pub fn try_named<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> Result<bool, ActionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Invert this guard.
    pub fn negate(self) -> Self {
        let name = format!("!{}", self.name);
        let inner = self.predicate;
        Self {
            name,
            predicate: Arc::new(move |ctx, event| inner(ctx, event).map(|passed| !passed)),
        }
    }

    /// Passes when every guard passes. Evaluation stops at the first failure.
    pub fn all(guards: Vec<Guard<C>>) -> Self {
        let name = join_names(&guards, " && ");
        Self {
            name,
            predicate: Arc::new(move |ctx, event| {
                for guard in &guards {
                    if !guard.check(ctx, event)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
        }
    }

    /// Passes when any guard passes. Evaluation stops at the first success.
    pub fn any(guards: Vec<Guard<C>>) -> Self {
        let name = join_names(&guards, " || ");
        Self {
            name,
            predicate: Arc::new(move |ctx, event| {
                for guard in &guards {
                    if guard.check(ctx, event)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }),
        }
    }
}

impl<C> Guard<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the predicate.
    pub fn check(&self, context: &C, event: &Event) -> Result<bool, ActionError> {
        (self.predicate)(context, event)
    }
}

fn join_names<C>(guards: &[Guard<C>], separator: &str) -> String {
    let names: Vec<&str> = guards.iter().map(|guard| guard.name()).collect();
    format!("({})", names.join(separator))
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.name).finish()
    }
}
