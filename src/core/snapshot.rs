//! Immutable machine snapshots.

use super::action::Effect;
use super::actor::ActorRef;
use super::configuration::Configuration;
use super::context::Context;
use super::event::Event;
use super::history::HistoryValue;
use super::value::StateValue;
use crate::config::DEFAULT_DELIMITER;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A machine snapshot: configuration, context, pending effects and children.
///
/// Snapshots are created once per microstep and never mutated afterwards;
/// the machine hands them out behind an `Arc`, so earlier snapshots remain
/// valid read-only history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<C: Context> {
    pub(crate) value: StateValue,
    pub(crate) context: C,
    pub(crate) configuration: Configuration,
    pub(crate) actions: Vec<Effect>,
    pub(crate) children: BTreeMap<String, ActorRef>,
    pub(crate) history_value: HistoryValue,
    pub(crate) done: bool,
    pub(crate) output: Option<Value>,
    pub(crate) event: Event,
    pub(crate) session_id: Option<String>,
    #[serde(default = "default_delimiter")]
    pub(crate) delimiter: String,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

/// Whether a machine is still running.
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    Active,
    Done { output: Option<Value> },
}

impl<C: Context> Snapshot<C> {
    pub fn value(&self) -> &StateValue {
        &self.value
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Effects produced by the step (or macrostep) that created this snapshot.
    pub fn actions(&self) -> &[Effect] {
        &self.actions
    }

    pub fn children(&self) -> &BTreeMap<String, ActorRef> {
        &self.children
    }

    pub fn child(&self, id: &str) -> Option<&ActorRef> {
        self.children.get(id)
    }

    pub fn history_value(&self) -> &HistoryValue {
        &self.history_value
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Output of the final state that completed the machine.
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// The event that produced this snapshot.
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn status(&self) -> Status {
        if self.done {
            Status::Done {
                output: self.output.clone(),
            }
        } else {
            Status::Active
        }
    }

    /// Whether the active value lies within `parent`.
    ///
    /// String arguments are read as paths in the machine's delimiter, so
    /// with the default `"a.b"` checks that `b` is active inside `a`.
    pub fn matches(&self, parent: impl Into<StateValue>) -> bool {
        let parent = parent.into().normalize(&self.delimiter);
        self.value.matches(&parent)
    }

    /// Every active path, parents before children.
    pub fn to_paths(&self) -> Vec<String> {
        self.value.to_paths(&self.delimiter)
    }

    /// Path delimiter of the machine that produced this snapshot.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Same snapshot with a different effect list.
    pub(crate) fn with_actions(&self, actions: Vec<Effect>) -> Self {
        Self {
            actions,
            ..self.clone()
        }
    }
}
