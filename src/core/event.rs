//! Events delivered to a machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name of the pseudo-event that drives the initial microstep.
pub const INIT_EVENT: &str = "statechart.init";

/// Transition table key matching any named event.
pub const WILDCARD: &str = "*";

/// Name reserved for eventless ("always") transitions.
pub const NULL_EVENT: &str = "";

/// Prefix marking error events.
pub const ERROR_EVENT_PREFIX: &str = "error.";

/// Prefix of the events raised when a compound or parallel node completes.
pub const DONE_STATE_PREFIX: &str = "done.state.";

/// A tagged value delivered to the machine.
///
/// Events are plain data: a name, an optional JSON payload and an optional
/// origin (the id of the actor that sent it).
///
/// # Example
///
/// ```rust
/// use harel::core::Event;
/// use serde_json::json;
///
/// let event = Event::new("FETCH").with_data(json!({ "page": 2 }));
/// assert_eq!(event.name, "FETCH");
/// assert_eq!(event.data["page"], 2);
/// assert!(!event.is_error());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, matched against transition tables
    pub name: String,
    /// Payload, `null` when absent
    #[serde(default)]
    pub data: Value,
    /// Id of the sending actor, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Value::Null,
            origin: None,
        }
    }

    /// Attach a payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Record the sending actor.
    pub fn from_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The init pseudo-event, carrying the machine input.
    pub fn init(input: Value) -> Self {
        Self::new(INIT_EVENT).with_data(input)
    }

    /// An error event. The payload is the error value that is surfaced when
    /// no active state accepts the event.
    pub fn error(kind: impl AsRef<str>, data: Value) -> Self {
        Self::new(format!("{ERROR_EVENT_PREFIX}{}", kind.as_ref())).with_data(data)
    }

    /// The completion event for the node with the given id.
    pub fn done_state(node_id: &str, output: Option<Value>) -> Self {
        Self::new(format!("{DONE_STATE_PREFIX}{node_id}")).with_data(output.unwrap_or(Value::Null))
    }

    pub fn is_init(&self) -> bool {
        self.name == INIT_EVENT
    }

    pub fn is_error(&self) -> bool {
        self.name.starts_with(ERROR_EVENT_PREFIX)
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
