//! State nodes of the static definition tree.

use super::transition::TransitionDefinition;
use crate::core::{Action, HistoryKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Index of a node in the definition arena.
///
/// Nodes are stored in document (pre-order) order, so comparing ids compares
/// document positions and every parent has a smaller id than its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural kind of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Atomic,
    Compound,
    Parallel,
    Final,
    History(HistoryKind),
}

/// A child actor started when its node is entered and stopped on exit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvokeDefinition {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub input: Value,
}

/// One node of the definition tree.
pub struct StateNode<C> {
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) initial: Option<NodeId>,
    /// Default targets of a history pseudostate.
    pub(crate) history_default: Vec<NodeId>,
    pub(crate) on: Vec<TransitionDefinition<C>>,
    pub(crate) always: Vec<TransitionDefinition<C>>,
    pub(crate) entry: Vec<Action<C>>,
    pub(crate) exit: Vec<Action<C>>,
    pub(crate) invoke: Vec<InvokeDefinition>,
    pub(crate) output: Option<Value>,
}

impl<C> StateNode<C> {
    /// Unique id, the delimited path from the machine id unless overridden.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key of this node within its parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn initial(&self) -> Option<NodeId> {
        self.initial
    }

    /// Transitions on named or wildcard events, in declared order.
    pub fn transitions(&self) -> &[TransitionDefinition<C>] {
        &self.on
    }

    /// Eventless transitions, in declared order.
    pub fn always(&self) -> &[TransitionDefinition<C>] {
        &self.always
    }

    pub fn entry(&self) -> &[Action<C>] {
        &self.entry
    }

    pub fn exit(&self) -> &[Action<C>] {
        &self.exit
    }

    pub fn invocations(&self) -> &[InvokeDefinition] {
        &self.invoke
    }

    /// Done data of a final node.
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, NodeKind::Atomic | NodeKind::Final)
    }

    pub fn is_compound(&self) -> bool {
        self.kind == NodeKind::Compound
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == NodeKind::Parallel
    }

    pub fn is_final(&self) -> bool {
        self.kind == NodeKind::Final
    }

    pub fn history_kind(&self) -> Option<HistoryKind> {
        match self.kind {
            NodeKind::History(kind) => Some(kind),
            _ => None,
        }
    }
}

impl<C> fmt::Debug for StateNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("transitions", &self.on)
            .field("always", &self.always)
            .finish_non_exhaustive()
    }
}
