//! Configuration resolution.
//!
//! Turns a symbolic [`StateValue`] into the full set of active nodes,
//! default-completing compound and parallel nodes the value leaves open.
//! The entry-set helpers used by the step executor live here too, since
//! entering a target and completing a value are the same walk.

use crate::core::{Configuration, HistoryValue, StateValue};
use crate::definition::{NodeId, StateTree};
use crate::error::StatechartError;
use std::collections::BTreeMap;

/// Resolve `value` against `tree`.
///
/// Compound nodes without an explicit child enter their recorded history
/// (when they declare a history pseudostate and `history` has a record) or
/// their initial child. Parallel regions missing from the value are
/// completed the same way.
///
/// # Errors
///
/// `InvalidStateValue` when a key names no child of its parent, a compound
/// node lists more than one active child, an atomic node is given children,
/// or a node cannot be default-completed.
pub fn resolve<C>(
    tree: &StateTree<C>,
    value: &StateValue,
    history: &HistoryValue,
) -> Result<Configuration, StatechartError> {
    let value = value.normalize(tree.delimiter());
    let mut configuration = Configuration::new();
    configuration.insert(tree.root());
    resolve_node(tree, tree.root(), &value, history, &mut configuration)?;
    Ok(configuration)
}

fn resolve_node<C>(
    tree: &StateTree<C>,
    node: NodeId,
    value: &StateValue,
    history: &HistoryValue,
    out: &mut Configuration,
) -> Result<(), StatechartError> {
    let state = tree.node(node);

    if state.is_compound() {
        match value {
            StateValue::Leaf(key) => {
                let child = child_for_key(tree, node, key)?;
                add_descendants(tree, child, history, out)
            }
            StateValue::Branch(map) if map.is_empty() => add_descendants(tree, node, history, out),
            StateValue::Branch(map) => {
                let mut entries = map.iter();
                let (key, nested) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => {
                        return Err(StatechartError::invalid_value(format!(
                            "compound state '{}' has more than one active child in {value}",
                            state.id()
                        )))
                    }
                };
                let child = child_for_key(tree, node, key)?;
                out.insert(child);
                resolve_node(tree, child, nested, history, out)
            }
        }
    } else if state.is_parallel() {
        let given: BTreeMap<&str, Option<&StateValue>> = match value {
            StateValue::Leaf(key) => std::iter::once((key.as_str(), None)).collect(),
            StateValue::Branch(map) => map
                .iter()
                .map(|(key, nested)| (key.as_str(), Some(nested)))
                .collect(),
        };
        for key in given.keys() {
            child_for_key(tree, node, key)?;
        }
        for region in tree.regions(node) {
            match given.get(tree.node(region).key()) {
                Some(Some(nested)) => {
                    out.insert(region);
                    resolve_node(tree, region, nested, history, out)?;
                }
                _ => add_descendants(tree, region, history, out)?,
            }
        }
        Ok(())
    } else if value.is_empty() {
        Ok(())
    } else {
        Err(StatechartError::invalid_value(format!(
            "atomic state '{}' cannot have active children, got {value}",
            state.id()
        )))
    }
}

fn child_for_key<C>(tree: &StateTree<C>, parent: NodeId, key: &str) -> Result<NodeId, StatechartError> {
    let child = tree.child_by_key(parent, key).ok_or_else(|| {
        StatechartError::invalid_value(format!(
            "state '{}' has no child '{key}'",
            tree.node(parent).id()
        ))
    })?;
    if tree.node(child).history_kind().is_some() {
        return Err(StatechartError::invalid_value(format!(
            "history state '{}' cannot be part of a state value",
            tree.node(child).id()
        )));
    }
    Ok(child)
}

/// Add `node` and its default completion to `out`.
///
/// Entering a history pseudostate enters what it resolves to instead of the
/// pseudostate itself.
pub(crate) fn add_descendants<C>(
    tree: &StateTree<C>,
    node: NodeId,
    history: &HistoryValue,
    out: &mut Configuration,
) -> Result<(), StatechartError> {
    let state = tree.node(node);

    if state.history_kind().is_some() {
        let parent = state.parent().ok_or_else(|| {
            StatechartError::invalid_value(format!("history state '{}' has no parent", state.id()))
        })?;
        let targets = history_targets(tree, node, parent, history)?;
        for &target in &targets {
            add_descendants(tree, target, history, out)?;
        }
        for &target in &targets {
            add_ancestors(tree, target, parent, history, out)?;
        }
        return Ok(());
    }

    out.insert(node);

    if state.is_compound() {
        if let Some(pseudo) = tree.history_child(node) {
            if history.get(state.id()).is_some() {
                return add_descendants(tree, pseudo, history, out);
            }
        }
        let initial = state.initial().ok_or_else(|| {
            StatechartError::invalid_value(format!(
                "compound state '{}' has no initial state",
                state.id()
            ))
        })?;
        add_descendants(tree, initial, history, out)?;
        add_ancestors(tree, initial, node, history, out)
    } else if state.is_parallel() {
        complete_regions(tree, node, history, out)
    } else {
        Ok(())
    }
}

/// Add the ancestors of `node` below `upto`, completing any parallel
/// ancestor's other regions.
pub(crate) fn add_ancestors<C>(
    tree: &StateTree<C>,
    node: NodeId,
    upto: NodeId,
    history: &HistoryValue,
    out: &mut Configuration,
) -> Result<(), StatechartError> {
    for ancestor in tree.proper_ancestors(node, Some(upto)) {
        out.insert(ancestor);
        if tree.node(ancestor).is_parallel() {
            complete_regions(tree, ancestor, history, out)?;
        }
    }
    Ok(())
}

fn complete_regions<C>(
    tree: &StateTree<C>,
    node: NodeId,
    history: &HistoryValue,
    out: &mut Configuration,
) -> Result<(), StatechartError> {
    let regions: Vec<NodeId> = tree.regions(node).collect();
    for region in regions {
        let covered = out
            .iter()
            .any(|active| active == region || tree.is_descendant(active, region));
        if !covered {
            add_descendants(tree, region, history, out)?;
        }
    }
    Ok(())
}

/// What entering the history pseudostate `pseudo` of `parent` resolves to:
/// the recorded nodes, else the pseudostate's default, else the initial child.
fn history_targets<C>(
    tree: &StateTree<C>,
    pseudo: NodeId,
    parent: NodeId,
    history: &HistoryValue,
) -> Result<Vec<NodeId>, StatechartError> {
    let parent_state = tree.node(parent);

    if let Some(recorded) = history.get(parent_state.id()) {
        return recorded
            .iter()
            .map(|id| {
                tree.find(id)
                    .filter(|&target| tree.is_descendant(target, parent))
                    .ok_or_else(|| {
                        StatechartError::invalid_value(format!(
                            "history of '{}' refers to unknown state '{id}'",
                            parent_state.id()
                        ))
                    })
            })
            .collect();
    }

    let defaults = &tree.node(pseudo).history_default;
    if !defaults.is_empty() {
        return Ok(defaults.clone());
    }

    parent_state.initial().map(|initial| vec![initial]).ok_or_else(|| {
        StatechartError::invalid_value(format!(
            "history state '{}' has no default and '{}' has no initial state",
            tree.node(pseudo).id(),
            parent_state.id()
        ))
    })
}
