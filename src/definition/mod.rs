//! The static definition tree.
//!
//! A machine definition is flattened into an arena of [`StateNode`]s in
//! document order. Nodes refer to their parent and children by [`NodeId`],
//! never by pointer, so the tree is a plain immutable value that can be
//! shared across threads behind an `Arc`.

mod node;
mod transition;
mod tree;

pub use node::{InvokeDefinition, NodeId, NodeKind, StateNode};
pub use transition::{EventDescriptor, TransitionDefinition};
pub use tree::{StateTree, STATE_IDENTIFIER};
