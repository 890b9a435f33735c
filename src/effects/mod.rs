//! Effectful execution around the pure core using Stillwater 0.11.0.
//!
//! The engine only describes effects. This module is the imperative shell
//! that carries them out: handlers turn effect descriptors into Stillwater
//! effects run against an environment, and the events they produce are fed
//! back into the machine.
//!
//! # Key Concepts
//!
//! - **Handlers**: `EffectHandlers` maps an effect kind to a handler factory
//! - **Interpreter**: owns the current snapshot and the queue of pending effects
//! - **Effects**: handlers return `BoxedEffect`, built with `pure()`, `fail()` or `from_fn()`

mod handler;
mod interpreter;

pub use handler::{EffectError, EffectHandler, EffectHandlers};
pub use interpreter::{Interpreter, DEFAULT_MAX_ROUNDS};
