//! Action definitions and the effect descriptors they resolve to.
//!
//! Actions are the static, declared side of a transition or state. Executing
//! one inside a microstep either produces a new context, queues an internal
//! event, changes the children map, or yields an [`Effect`] descriptor. The
//! core never performs an effect itself; descriptors are returned in the
//! snapshot's `actions` list for the caller to carry out.

use super::actor::{ActorRef, Spawner};
use super::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by a user guard or action.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Type alias for context assignment functions.
pub type Assigner<C> =
    Arc<dyn Fn(&C, &Event, &mut Spawner) -> Result<C, ActionError> + Send + Sync>;

/// A declared action.
pub enum Action<C> {
    /// Replace the context with the returned value. The spawner registers
    /// child actors whose references can be stored in the new context.
    Assign(Assigner<C>),

    /// Queue an internal event, processed later in the same macrostep.
    Raise(Event),

    /// Deliver an event to another actor, optionally after a delay.
    SendTo {
        target: String,
        event: Event,
        delay: Option<Duration>,
    },

    /// Spawn a child actor.
    Spawn {
        src: String,
        id: Option<String>,
        input: Value,
    },

    /// Stop a child actor. Stopping an unknown id is a no-op.
    Stop { id: String },

    /// An opaque effect for the caller's execution context.
    Perform { kind: String, params: Value },
}

impl<C: 'static> Action<C> {
    /// Assign a new context computed from the current context and event.
    ///
    /// # Example
    ///
    /// ```rust
    /// use harel::core::{Action, Event};
    /// use serde_json::{json, Value};
    ///
    /// let grant: Action<Value> = Action::assign(|ctx: &Value, _: &Event| {
    ///     let mut next = ctx.clone();
    ///     next["granted"] = json!(true);
    ///     next
    /// });
    /// assert_eq!(grant.label(), "assign");
    /// ```
    pub fn assign<F>(assigner: F) -> Self
    where
        F: Fn(&C, &Event) -> C + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(move |ctx, event, _| Ok(assigner(ctx, event))))
    }

    /// Assign with a fallible function.
    pub fn try_assign<F>(assigner: F) -> Self
    where
        F: Fn(&C, &Event) -> Result<C, ActionError> + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(move |ctx, event, _| assigner(ctx, event)))
    }

    /// Assign with access to the spawner.
    pub fn assign_with_spawn<F>(assigner: F) -> Self
    where
        F: Fn(&C, &Event, &mut Spawner) -> Result<C, ActionError> + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(assigner))
    }
}

impl<C> Action<C> {
    pub fn raise(event: impl Into<Event>) -> Self {
        Action::Raise(event.into())
    }

    pub fn send_to(target: impl Into<String>, event: impl Into<Event>) -> Self {
        Action::SendTo {
            target: target.into(),
            event: event.into(),
            delay: None,
        }
    }

    pub fn send_after(target: impl Into<String>, event: impl Into<Event>, delay: Duration) -> Self {
        Action::SendTo {
            target: target.into(),
            event: event.into(),
            delay: Some(delay),
        }
    }

    /// Spawn an actor with a generated id.
    pub fn spawn(src: impl Into<String>, input: Value) -> Self {
        Action::Spawn {
            src: src.into(),
            id: None,
            input,
        }
    }

    pub fn spawn_with_id(id: impl Into<String>, src: impl Into<String>, input: Value) -> Self {
        Action::Spawn {
            src: src.into(),
            id: Some(id.into()),
            input,
        }
    }

    pub fn stop(id: impl Into<String>) -> Self {
        Action::Stop { id: id.into() }
    }

    pub fn perform(kind: impl Into<String>, params: Value) -> Self {
        Action::Perform {
            kind: kind.into(),
            params,
        }
    }

    /// Short label used in logs and error reports.
    pub fn label(&self) -> String {
        match self {
            Action::Assign(_) => "assign".to_string(),
            Action::Raise(event) => format!("raise({})", event.name),
            Action::SendTo { target, event, .. } => format!("sendTo({target}, {})", event.name),
            Action::Spawn { src, .. } => format!("spawn({src})"),
            Action::Stop { id } => format!("stop({id})"),
            Action::Perform { kind, .. } => kind.clone(),
        }
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        match self {
            Action::Assign(assigner) => Action::Assign(Arc::clone(assigner)),
            Action::Raise(event) => Action::Raise(event.clone()),
            Action::SendTo {
                target,
                event,
                delay,
            } => Action::SendTo {
                target: target.clone(),
                event: event.clone(),
                delay: *delay,
            },
            Action::Spawn { src, id, input } => Action::Spawn {
                src: src.clone(),
                id: id.clone(),
                input: input.clone(),
            },
            Action::Stop { id } => Action::Stop { id: id.clone() },
            Action::Perform { kind, params } => Action::Perform {
                kind: kind.clone(),
                params: params.clone(),
            },
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Side-effect descriptor returned to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Instantiate and start a child actor.
    StartActor { actor: ActorRef },
    /// Shut down a child actor.
    StopActor { id: String },
    /// Deliver an event to another actor.
    SendTo {
        target: String,
        event: Event,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay: Option<Duration>,
    },
    /// Caller-defined effect.
    Custom { kind: String, params: Value },
}

impl Effect {
    /// Kind used to look up a handler for this effect.
    pub fn kind(&self) -> &str {
        match self {
            Effect::StartActor { .. } => "start_actor",
            Effect::StopActor { .. } => "stop_actor",
            Effect::SendTo { .. } => "send_to",
            Effect::Custom { kind, .. } => kind,
        }
    }
}
