//! Symbolic description of the active states.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Recursive description of the active sub-states of a machine.
///
/// A `Leaf` names an atomic child; a `Branch` maps a compound or parallel
/// child to its own nested value (one entry per region for parallel states).
/// Serialized untagged, so `"idle"` and `{"loading": "retrying"}` are both
/// valid JSON forms.
///
/// # Example
///
/// ```rust
/// use harel::core::StateValue;
///
/// let value = StateValue::from_path("loading.retrying", ".");
/// assert!(value.matches(&StateValue::from("loading")));
/// assert_eq!(value.to_paths("."), vec!["loading", "loading.retrying"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Leaf(String),
    Branch(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// A branch with no entries, the value of an atomic node.
    pub fn empty() -> Self {
        StateValue::Branch(BTreeMap::new())
    }

    /// A branch with a single entry.
    pub fn branch(key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), value.into());
        StateValue::Branch(map)
    }

    /// Expand a delimited path such as `"a.b.c"` into nested branches.
    pub fn from_path(path: &str, delimiter: &str) -> Self {
        let mut segments: Vec<&str> = path.split(delimiter).collect();
        let last = segments.pop().unwrap_or_default();
        segments
            .into_iter()
            .rev()
            .fold(StateValue::Leaf(last.to_string()), |inner, key| {
                StateValue::branch(key, inner)
            })
    }

    /// Expand every delimited leaf in this value.
    pub fn normalize(&self, delimiter: &str) -> Self {
        match self {
            StateValue::Leaf(name) if name.contains(delimiter) => {
                StateValue::from_path(name, delimiter)
            }
            StateValue::Leaf(name) => StateValue::Leaf(name.clone()),
            StateValue::Branch(map) => StateValue::Branch(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.normalize(delimiter)))
                    .collect(),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StateValue::Branch(map) if map.is_empty())
    }

    /// Whether this value lies within `parent`.
    ///
    /// `{"a": "b"}` matches `"a"` and `{"a": "b"}`, but not `{"a": "c"}`.
    pub fn matches(&self, parent: &StateValue) -> bool {
        match (parent, self) {
            (StateValue::Leaf(p), StateValue::Leaf(c)) => p == c,
            (StateValue::Branch(_), StateValue::Leaf(_)) => false,
            (StateValue::Leaf(p), StateValue::Branch(child)) => child.contains_key(p),
            (StateValue::Branch(parent), StateValue::Branch(child)) => {
                parent.iter().all(|(key, parent_value)| {
                    child
                        .get(key)
                        .is_some_and(|child_value| child_value.matches(parent_value))
                })
            }
        }
    }

    /// Every active path, parents before children.
    pub fn to_paths(&self, delimiter: &str) -> Vec<String> {
        let mut paths = Vec::new();
        collect_paths(self, None, delimiter, &mut paths);
        paths
    }
}

fn collect_paths(value: &StateValue, prefix: Option<&str>, delimiter: &str, out: &mut Vec<String>) {
    let join = |key: &str| match prefix {
        Some(prefix) => format!("{prefix}{delimiter}{key}"),
        None => key.to_string(),
    };
    match value {
        StateValue::Leaf(name) => out.push(join(name)),
        StateValue::Branch(map) => {
            for (key, child) in map {
                let path = join(key);
                out.push(path.clone());
                collect_paths(child, Some(&path), delimiter, out);
            }
        }
    }
}

impl From<&str> for StateValue {
    fn from(name: &str) -> Self {
        StateValue::Leaf(name.to_string())
    }
}

impl From<String> for StateValue {
    fn from(name: String) -> Self {
        StateValue::Leaf(name)
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Leaf(name) => f.write_str(name),
            StateValue::Branch(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}
