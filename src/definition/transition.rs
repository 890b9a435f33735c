//! Static transition definitions.

use super::node::NodeId;
use crate::core::{Action, Event, Guard, ActionError, NULL_EVENT, WILDCARD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which events a transition responds to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDescriptor {
    /// Events with exactly this name.
    Named(String),
    /// Any named event.
    Wildcard,
    /// No event: checked after every microstep.
    Always,
}

impl EventDescriptor {
    pub fn parse(descriptor: &str) -> Self {
        match descriptor {
            WILDCARD => EventDescriptor::Wildcard,
            NULL_EVENT => EventDescriptor::Always,
            name => EventDescriptor::Named(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventDescriptor::Named(name) => name,
            EventDescriptor::Wildcard => WILDCARD,
            EventDescriptor::Always => NULL_EVENT,
        }
    }
}

/// An immutable transition of the definition tree.
pub struct TransitionDefinition<C> {
    pub(crate) source: NodeId,
    pub(crate) event: EventDescriptor,
    pub(crate) targets: Vec<NodeId>,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) actions: Vec<Action<C>>,
    pub(crate) internal: bool,
}

impl<C> TransitionDefinition<C> {
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn event(&self) -> &EventDescriptor {
        &self.event
    }

    /// Targets; empty for targetless transitions.
    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn guard(&self) -> Option<&Guard<C>> {
        self.guard.as_ref()
    }

    pub fn actions(&self) -> &[Action<C>] {
        &self.actions
    }

    /// Internal transitions do not exit a compound source whose descendants
    /// they target.
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn is_targetless(&self) -> bool {
        self.targets.is_empty()
    }

    /// Whether this transition responds to a named event.
    pub fn accepts(&self, event: &Event) -> bool {
        match &self.event {
            EventDescriptor::Named(name) => *name == event.name,
            EventDescriptor::Wildcard => true,
            EventDescriptor::Always => false,
        }
    }

    /// Whether the guard allows this transition (absent guards always do).
    pub fn is_enabled(&self, context: &C, event: &Event) -> Result<bool, ActionError> {
        match &self.guard {
            Some(guard) => guard.check(context, event),
            None => Ok(true),
        }
    }
}

impl<C> fmt::Debug for TransitionDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDefinition")
            .field("source", &self.source)
            .field("event", &self.event)
            .field("targets", &self.targets)
            .field("guard", &self.guard)
            .field("actions", &self.actions)
            .field("internal", &self.internal)
            .finish()
    }
}
