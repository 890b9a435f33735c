//! Arena-backed definition tree and hierarchy queries.

use super::node::{NodeId, StateNode};
use crate::core::{Configuration, StateValue};
use crate::error::StatechartError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Prefix marking a state id reference (`#id`).
pub const STATE_IDENTIFIER: &str = "#";

/// The static definition tree.
///
/// Nodes live in a single arena indexed by [`NodeId`] and refer to each other
/// by index only. The tree is built once and shared immutably by every
/// snapshot of the machine.
pub struct StateTree<C> {
    machine_id: String,
    delimiter: String,
    nodes: Vec<StateNode<C>>,
    ids: HashMap<String, NodeId>,
}

impl<C> StateTree<C> {
    /// Nodes must be in document order with the root first.
    pub(crate) fn new(machine_id: String, delimiter: String, nodes: Vec<StateNode<C>>) -> Self {
        let ids = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), NodeId(index)))
            .collect();
        Self {
            machine_id,
            delimiter,
            nodes,
            ids,
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The node behind an id handed out by this tree.
    pub fn node(&self, id: NodeId) -> &StateNode<C> {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&StateNode<C>> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &StateNode<C>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Find a node by id, with or without the `#` prefix.
    pub fn find(&self, id: &str) -> Option<NodeId> {
        let id = id.strip_prefix(STATE_IDENTIFIER).unwrap_or(id);
        self.ids.get(id).copied()
    }

    /// Find a node by id, failing with `UnknownStateId`.
    pub fn lookup(&self, id: &str) -> Result<NodeId, StatechartError> {
        self.find(id).ok_or_else(|| StatechartError::UnknownStateId {
            id: id.strip_prefix(STATE_IDENTIFIER).unwrap_or(id).to_string(),
            machine: self.machine_id.clone(),
        })
    }

    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).key == key)
    }

    /// Children of `node` that can be active, i.e. all but history
    /// pseudostates. For a parallel node these are its regions.
    pub fn regions(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(node)
            .children
            .iter()
            .copied()
            .filter(|&child| self.node(child).history_kind().is_none())
    }

    /// The history pseudostate declared under `node`, if any.
    pub fn history_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).history_kind().is_some())
    }

    /// Ancestors of `node`, nearest first, stopping before `until` (or after
    /// the root when `until` is `None`).
    pub fn proper_ancestors(&self, node: NodeId, until: Option<NodeId>) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.node(node).parent;
        while let Some(parent) = current {
            if Some(parent) == until {
                break;
            }
            ancestors.push(parent);
            current = self.node(parent).parent;
        }
        ancestors
    }

    /// Whether `node` is a proper descendant of `ancestor`.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.node(node).parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.node(parent).parent;
        }
        false
    }

    /// Least common compound ancestor: the nearest compound proper ancestor
    /// of the first node that contains all the others, or the root.
    pub fn lcca(&self, nodes: &[NodeId]) -> NodeId {
        let Some((&first, rest)) = nodes.split_first() else {
            return self.root();
        };
        self.proper_ancestors(first, None)
            .into_iter()
            .find(|&ancestor| {
                (self.node(ancestor).is_compound() || ancestor == self.root())
                    && rest.iter().all(|&other| self.is_descendant(other, ancestor))
            })
            .unwrap_or_else(|| self.root())
    }

    /// Active atomic nodes in document order.
    pub fn atomic_nodes(&self, configuration: &Configuration) -> Vec<NodeId> {
        configuration
            .iter()
            .filter(|&node| self.node(node).is_atomic())
            .collect()
    }

    /// The state value of a configuration, relative to the root.
    pub fn state_value(&self, configuration: &Configuration) -> StateValue {
        self.value_of(self.root(), configuration)
    }

    fn value_of(&self, node: NodeId, configuration: &Configuration) -> StateValue {
        let state = self.node(node);
        if state.is_compound() {
            let active = state
                .children
                .iter()
                .copied()
                .find(|&child| configuration.contains(child));
            match active {
                Some(child) if self.node(child).is_atomic() => {
                    StateValue::Leaf(self.node(child).key.clone())
                }
                Some(child) => StateValue::branch(
                    self.node(child).key.clone(),
                    self.value_of(child, configuration),
                ),
                None => StateValue::empty(),
            }
        } else if state.is_parallel() {
            let regions: BTreeMap<String, StateValue> = self
                .regions(node)
                .map(|region| {
                    (
                        self.node(region).key.clone(),
                        self.value_of(region, configuration),
                    )
                })
                .collect();
            StateValue::Branch(regions)
        } else {
            StateValue::empty()
        }
    }

    /// Whether `node` has reached completion in `configuration`.
    ///
    /// Compound nodes are done when a final child is active, parallel nodes
    /// when every region is done.
    pub fn is_in_final_state(&self, node: NodeId, configuration: &Configuration) -> bool {
        let state = self.node(node);
        if state.is_compound() {
            state
                .children
                .iter()
                .any(|&child| configuration.contains(child) && self.node(child).is_final())
        } else if state.is_parallel() {
            self.regions(node)
                .all(|region| self.is_in_final_state(region, configuration))
        } else {
            state.is_final() && configuration.contains(node)
        }
    }

    /// Done data of the root's active final child.
    pub fn final_output(&self, configuration: &Configuration) -> Option<Value> {
        self.regions(self.root())
            .find(|&child| configuration.contains(child) && self.node(child).is_final())
            .and_then(|child| self.node(child).output().cloned())
    }
}

impl<C> fmt::Debug for StateTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("machine_id", &self.machine_id)
            .field("nodes", &self.nodes)
            .finish()
    }
}
