//! History pseudostate records.
//!
//! When a compound node that declares a history pseudostate is exited, the
//! microstep records which of its descendants were active. Re-entering the
//! node later restores that record instead of the declared initial child.
//! The record is immutable: `record` returns a new value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Depth of a history pseudostate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// Remember only the active child of the parent.
    Shallow,
    /// Remember every active atomic descendant of the parent.
    Deep,
}

/// Per compound-node record of previously active descendants.
///
/// Keys and entries are state node ids, so a record survives serialization
/// and can be restored against the same definition in another process.
///
/// # Example
///
/// ```rust
/// use harel::core::HistoryValue;
///
/// let history = HistoryValue::new();
/// let updated = history.record("player", vec!["player.playing".to_string()]);
///
/// assert!(history.get("player").is_none()); // Original unchanged
/// assert_eq!(updated.get("player").unwrap(), ["player.playing".to_string()]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryValue {
    entries: BTreeMap<String, Vec<String>>,
}

impl HistoryValue {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Record the descendants active when `node_id` was exited, returning a
    /// new history. An earlier record for the same node is replaced.
    pub fn record(&self, node_id: impl Into<String>, active: Vec<String>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(node_id.into(), active);
        Self { entries }
    }

    /// The recorded descendants of `node_id`, if it was ever exited.
    pub fn get(&self, node_id: &str) -> Option<&[String]> {
        self.entries
            .get(node_id)
            .map(Vec::as_slice)
            .filter(|recorded| !recorded.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over `(node id, recorded ids)` in node id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(node, recorded)| (node.as_str(), recorded.as_slice()))
    }
}
