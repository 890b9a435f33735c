//! Harel: a pure functional statechart interpreter
//!
//! Harel follows Stillwater's "pure core, imperative shell" philosophy.
//! Machine definitions are immutable trees; every operation on them is a pure
//! function from a snapshot and an event to a new snapshot. Side effects are
//! never performed by the core. They are returned as descriptors on the
//! snapshot and carried out by the caller, or by the [`effects::Interpreter`].
//!
//! # Core Concepts
//!
//! - **States**: atomic, compound, parallel, final and history nodes
//! - **Snapshots**: immutable state value, context, children and history
//! - **Macrosteps**: an event plus every eventless and raised follow-up step
//! - **Effects**: descriptors for actors, messages and custom work
//!
//! # Example
//!
//! ```rust
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
//!     .state(
//!         StateNodeBuilder::atomic("loading")
//!             .always(TransitionBuilder::to("success")),
//!     )
//!     .state(StateNodeBuilder::final_state("success"))
//!     .build()
//!     .unwrap();
//!
//! let idle = machine.initial_snapshot(None).unwrap();
//! let step = machine.macrostep(&idle, "FETCH", None).unwrap();
//!
//! assert!(step.snapshot.matches("success"));
//! assert_eq!(step.microstates.len(), 2);
//! assert!(step.snapshot.is_done());
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod definition;
pub mod effects;
pub mod engine;
pub mod error;
pub mod machine;
pub mod validation;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, StateNodeBuilder, TransitionBuilder};
pub use checkpoint::{Checkpoint, CheckpointError};
pub use config::MachineConfig;
pub use crate::core::{Action, ActorContext, Effect, Event, Guard, Snapshot, StateValue, Status};
pub use engine::Macrostep;
pub use error::StatechartError;
pub use machine::{StateInput, StateMachine};
