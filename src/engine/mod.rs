//! The interpreter core.
//!
//! Four pure functions over the definition tree:
//! - [`resolve`]: a state value to the configuration it denotes
//! - [`select`]: the transitions an event enables in a configuration
//! - [`microstep`]: one atomic application of a transition set
//! - [`macrostep`]: microsteps driven until the configuration is stable
//!
//! None of them perform I/O or mutate their inputs; effects come back as
//! descriptors on the resulting snapshot.

mod macrostep;
mod resolve;
mod select;
mod step;

pub use macrostep::{macrostep, Macrostep};
pub use resolve::resolve;
pub use select::{select, Probe};
pub use step::{microstep, Step};

pub(crate) use macrostep::drive;
pub(crate) use select::matching;
pub(crate) use step::enter_initial;
