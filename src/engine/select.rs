//! Transition selection.

use crate::core::{Configuration, Event};
use crate::definition::{EventDescriptor, NodeId, StateNode, StateTree, TransitionDefinition};
use crate::error::StatechartError;
use std::collections::BTreeSet;
use std::ptr;

/// Which transition tables the selector consults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// Named transitions matching the event, then wildcard transitions.
    Event,
    /// Eventless (`always`) transitions.
    Eventless,
}

/// Select the transitions to fire for `event` in `configuration`.
///
/// Each active atomic node, in document order, walks outward through its
/// ancestors; the first transition whose guard passes wins for that node.
/// Transitions whose exit sets intersect are then reduced to one: the one
/// with the deeper source, or the one selected first at equal depth.
///
/// # Errors
///
/// `GuardFailed` when a guard returns an error.
pub fn select<'t, C>(
    tree: &'t StateTree<C>,
    configuration: &Configuration,
    context: &C,
    event: &Event,
    probe: Probe,
) -> Result<Vec<&'t TransitionDefinition<C>>, StatechartError> {
    let mut enabled: Vec<&'t TransitionDefinition<C>> = Vec::new();

    for atomic in tree.atomic_nodes(configuration) {
        let chain = std::iter::once(atomic).chain(tree.proper_ancestors(atomic, None));
        'walk: for node in chain {
            for transition in matching(tree.node(node), event, probe) {
                if is_enabled(transition, context, event)? {
                    if !enabled.iter().any(|&seen| ptr::eq(seen, transition)) {
                        enabled.push(transition);
                    }
                    break 'walk;
                }
            }
        }
    }

    let selected = remove_conflicts(tree, configuration, enabled);
    tracing::trace!(
        event = %event.name,
        ?probe,
        selected = selected.len(),
        "selected transitions"
    );
    Ok(selected)
}

/// Transitions of `node` that respond to `event`, exact names before
/// wildcards, each in declared order. Guards are not evaluated.
pub(crate) fn matching<'t, C>(
    node: &'t StateNode<C>,
    event: &Event,
    probe: Probe,
) -> Vec<&'t TransitionDefinition<C>> {
    match probe {
        Probe::Eventless => node.always().iter().collect(),
        Probe::Event => {
            // Named descriptors are preferred over the wildcard on the same node.
            let (wildcard, named): (Vec<_>, Vec<_>) = node
                .transitions()
                .iter()
                .filter(|transition| transition.accepts(event))
                .partition(|transition| *transition.event() == EventDescriptor::Wildcard);
            named.into_iter().chain(wildcard).collect()
        }
    }
}

fn is_enabled<C>(
    transition: &TransitionDefinition<C>,
    context: &C,
    event: &Event,
) -> Result<bool, StatechartError> {
    transition
        .is_enabled(context, event)
        .map_err(|source| StatechartError::GuardFailed {
            guard: transition
                .guard()
                .map(|guard| guard.name().to_string())
                .unwrap_or_default(),
            source,
        })
}

fn remove_conflicts<'t, C>(
    tree: &StateTree<C>,
    configuration: &Configuration,
    enabled: Vec<&'t TransitionDefinition<C>>,
) -> Vec<&'t TransitionDefinition<C>> {
    let mut kept: Vec<(&'t TransitionDefinition<C>, BTreeSet<NodeId>)> = Vec::new();

    for candidate in enabled {
        let exits = exit_set(tree, configuration, candidate);
        let depth = tree.node(candidate.source()).depth();
        let mut preempted = false;
        let mut displaced = Vec::new();

        for (index, (other, other_exits)) in kept.iter().enumerate() {
            if exits.is_disjoint(other_exits) {
                continue;
            }
            if depth > tree.node(other.source()).depth() {
                displaced.push(index);
            } else {
                preempted = true;
                break;
            }
        }

        if !preempted {
            for index in displaced.into_iter().rev() {
                kept.remove(index);
            }
            kept.push((candidate, exits));
        }
    }

    kept.into_iter().map(|(transition, _)| transition).collect()
}

/// The node whose active descendants a transition exits, `None` for
/// targetless transitions.
pub(crate) fn transition_domain<C>(
    tree: &StateTree<C>,
    transition: &TransitionDefinition<C>,
) -> Option<NodeId> {
    if transition.is_targetless() {
        return None;
    }
    let source = transition.source();
    if transition.is_internal()
        && tree.node(source).is_compound()
        && transition
            .targets()
            .iter()
            .all(|&target| tree.is_descendant(target, source))
    {
        return Some(source);
    }
    let mut nodes = Vec::with_capacity(transition.targets().len() + 1);
    nodes.push(source);
    nodes.extend_from_slice(transition.targets());
    Some(tree.lcca(&nodes))
}

/// Active nodes the transition exits.
pub(crate) fn exit_set<C>(
    tree: &StateTree<C>,
    configuration: &Configuration,
    transition: &TransitionDefinition<C>,
) -> BTreeSet<NodeId> {
    match transition_domain(tree, transition) {
        Some(domain) => configuration
            .iter()
            .filter(|&node| tree.is_descendant(node, domain))
            .collect(),
        None => BTreeSet::new(),
    }
}
