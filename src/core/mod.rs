//! Core value types of the interpreter.
//!
//! This module contains the plain data the engine works on:
//! - Context bound, events and state values
//! - Guards and actions, and the effect descriptors actions resolve to
//! - Actor references and the spawn side-channel
//! - History records, configurations and snapshots
//!
//! Nothing in this module performs I/O; effects are described, never run.

mod action;
mod actor;
mod configuration;
mod context;
mod event;
mod guard;
mod history;
mod snapshot;
mod value;

pub use action::{Action, ActionError, Assigner, Effect};
pub use actor::{ActorContext, ActorRef, Spawner};
pub use configuration::Configuration;
pub use context::Context;
pub use event::{
    Event, DONE_STATE_PREFIX, ERROR_EVENT_PREFIX, INIT_EVENT, NULL_EVENT, WILDCARD,
};
pub use guard::{Guard, GuardPredicate};
pub use history::{HistoryKind, HistoryValue};
pub use snapshot::{Snapshot, Status};
pub use value::StateValue;
