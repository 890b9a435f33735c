//! Child actor references and the spawn side-channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Reference to a spawned child actor.
///
/// The core never runs child interpreters; a reference only identifies the
/// actor. Its lifetime runs from the `StartActor` effect that announces it
/// to the `StopActor` effect that retires it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorRef {
    id: String,
    src: String,
    #[serde(default)]
    input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
}

impl ActorRef {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Logic source the caller instantiates the actor from.
    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Id of the state node whose exit stops this actor, if any.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// Collects actor creation requests.
///
/// `spawn` hands back a usable reference immediately while the actual start
/// is deferred: the microstep drains the requests into the children map and
/// emits a `StartActor` effect for each.
///
/// # Example
///
/// ```rust
/// use harel::core::Spawner;
/// use serde_json::Value;
///
/// let mut spawner = Spawner::detached();
/// let first = spawner.spawn("fetcher", Value::Null);
/// let second = spawner.spawn("fetcher", Value::Null);
/// assert_eq!(first.id(), "fetcher:0");
/// assert_eq!(second.id(), "fetcher:1");
/// assert_eq!(spawner.requests().len(), 2);
/// ```
#[derive(Debug)]
pub struct Spawner {
    owner: Option<String>,
    taken: BTreeSet<String>,
    requests: Vec<ActorRef>,
}

impl Spawner {
    pub(crate) fn new<'a>(owner: Option<String>, existing: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            owner,
            taken: existing.into_iter().cloned().collect(),
            requests: Vec::new(),
        }
    }

    /// A spawner with no owner and no existing children.
    pub fn detached() -> Self {
        Self::new(None, std::iter::empty())
    }

    /// Register an actor with a generated id (`"{src}:{n}"`, smallest free `n`).
    pub fn spawn(&mut self, src: impl Into<String>, input: Value) -> ActorRef {
        let src = src.into();
        let id = (0..)
            .map(|n| format!("{src}:{n}"))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or_else(|| src.clone());
        self.register(id, src, input)
    }

    /// Register an actor under an explicit id. A live actor with the same id
    /// is replaced.
    pub fn spawn_with_id(
        &mut self,
        id: impl Into<String>,
        src: impl Into<String>,
        input: Value,
    ) -> ActorRef {
        let id = id.into();
        if self.taken.contains(&id) {
            tracing::warn!(actor = %id, "spawning actor over an existing id");
        }
        self.register(id, src.into(), input)
    }

    fn register(&mut self, id: String, src: String, input: Value) -> ActorRef {
        let actor = ActorRef {
            id: id.clone(),
            src,
            input,
            owner: self.owner.clone(),
        };
        self.taken.insert(id);
        self.requests.push(actor.clone());
        actor
    }

    /// Requests registered so far, in spawn order.
    pub fn requests(&self) -> &[ActorRef] {
        &self.requests
    }

    pub(crate) fn into_requests(self) -> Vec<ActorRef> {
        self.requests
    }
}

/// Identity of the actor session running a machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub session_id: String,
}

impl ActorContext {
    /// A context with a fresh random session id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

impl Default for ActorContext {
    fn default() -> Self {
        Self::new()
    }
}
