//! The set of concurrently active state nodes.

use crate::definition::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Concurrently active nodes of the definition tree.
///
/// Node ids are assigned in document order, so iteration yields parents
/// before children and iterating in reverse yields a valid exit order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    nodes: BTreeSet<NodeId>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Active nodes in document order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> bool {
        self.nodes.remove(&node)
    }
}

impl FromIterator<NodeId> for Configuration {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_document_order() {
        let config: Configuration = [NodeId(4), NodeId(0), NodeId(2)].into_iter().collect();
        let forward: Vec<NodeId> = config.iter().collect();
        let backward: Vec<NodeId> = config.iter().rev().collect();

        assert_eq!(forward, vec![NodeId(0), NodeId(2), NodeId(4)]);
        assert_eq!(backward, vec![NodeId(4), NodeId(2), NodeId(0)]);
    }

    #[test]
    fn insert_and_remove() {
        let mut config = Configuration::new();
        assert!(config.insert(NodeId(1)));
        assert!(!config.insert(NodeId(1)));
        assert!(config.contains(NodeId(1)));
        assert!(config.remove(NodeId(1)));
        assert!(config.is_empty());
    }
}
