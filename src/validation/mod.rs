//! Accumulating structural checks on a definition.
//!
//! Every check runs and every violation is reported at once, using
//! stillwater's `Validation` instead of stopping at the first problem.

mod violations;

pub use violations::DefinitionViolation;

use crate::definition::NodeKind;
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Result of a structural check.
pub type Checked = Validation<(), NonEmptyVec<DefinitionViolation>>;

/// Flat view of one draft node, after target resolution was attempted.
#[derive(Debug, Clone)]
pub(crate) struct NodeOutline<'a> {
    pub id: &'a str,
    pub kind: NodeKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Explicitly declared initial key and whether it names a child.
    pub initial: Option<(&'a str, bool)>,
    /// `(event, target)` pairs that did not resolve.
    pub unresolved: Vec<(String, &'a str)>,
    /// Resolved targets of every transition with more than one target.
    pub target_sets: Vec<(String, Vec<usize>)>,
}

/// Run every check over a flattened tree.
pub(crate) fn validate(nodes: &[NodeOutline<'_>]) -> Checked {
    let mut checks: Vec<Checked> = Vec::new();
    checks.extend(unique_ids(nodes));
    checks.extend(nodes.iter().map(known_initial));
    checks.extend(nodes.iter().flat_map(resolved_targets));
    checks.extend(nodes.iter().flat_map(|node| orthogonal_targets(nodes, node)));
    checks.extend(nodes.iter().map(|node| history_placement(nodes, node)));
    checks.extend(nodes.iter().map(|node| single_history(nodes, node)));
    checks.extend(nodes.iter().map(final_is_leaf));

    if checks.is_empty() {
        return Validation::success(());
    }
    Validation::all_vec(checks).map(|_| ())
}

fn check(violation: Option<DefinitionViolation>) -> Checked {
    match violation {
        Some(violation) => Validation::fail(violation),
        None => Validation::success(()),
    }
}

fn unique_ids(nodes: &[NodeOutline<'_>]) -> Vec<Checked> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .map(|node| {
            check((!seen.insert(node.id)).then(|| DefinitionViolation::DuplicateId {
                id: node.id.to_string(),
            }))
        })
        .collect()
}

fn known_initial(node: &NodeOutline<'_>) -> Checked {
    check(match node.initial {
        Some((initial, false)) => Some(DefinitionViolation::UnknownInitial {
            state: node.id.to_string(),
            initial: initial.to_string(),
        }),
        _ => None,
    })
}

fn resolved_targets(node: &NodeOutline<'_>) -> Vec<Checked> {
    node.unresolved
        .iter()
        .map(|(event, target)| {
            Validation::fail(DefinitionViolation::UnresolvedTarget {
                state: node.id.to_string(),
                event: event.clone(),
                target: target.to_string(),
            })
        })
        .collect()
}

fn orthogonal_targets(nodes: &[NodeOutline<'_>], node: &NodeOutline<'_>) -> Vec<Checked> {
    let mut checks = Vec::new();
    for (event, targets) in &node.target_sets {
        for (index, &first) in targets.iter().enumerate() {
            for &second in &targets[index + 1..] {
                if !in_separate_regions(nodes, first, second) {
                    checks.push(Validation::fail(DefinitionViolation::ConflictingTargets {
                        state: node.id.to_string(),
                        event: event.clone(),
                        first: nodes[first].id.to_string(),
                        second: nodes[second].id.to_string(),
                    }));
                }
            }
        }
    }
    checks
}

/// Whether the nearest common ancestor of `a` and `b` is a parallel node
/// and neither lies on the other's ancestor chain.
fn in_separate_regions(nodes: &[NodeOutline<'_>], a: usize, b: usize) -> bool {
    let chain = |start: usize| {
        std::iter::successors(Some(start), move |&node| nodes[node].parent)
    };
    let above_a: HashSet<usize> = chain(a).collect();
    match chain(b).find(|node| above_a.contains(node)) {
        Some(common) => common != a && common != b && nodes[common].kind == NodeKind::Parallel,
        None => false,
    }
}

fn history_placement(nodes: &[NodeOutline<'_>], node: &NodeOutline<'_>) -> Checked {
    let NodeKind::History(_) = node.kind else {
        return Validation::success(());
    };
    let parent_is_compound = node
        .parent
        .is_some_and(|parent| nodes[parent].kind == NodeKind::Compound);
    check((!parent_is_compound || !node.children.is_empty()).then(|| {
        DefinitionViolation::MisplacedHistory {
            state: node.id.to_string(),
        }
    }))
}

fn single_history(nodes: &[NodeOutline<'_>], node: &NodeOutline<'_>) -> Checked {
    let histories = node
        .children
        .iter()
        .filter(|&&child| matches!(nodes[child].kind, NodeKind::History(_)))
        .count();
    check((histories > 1).then(|| DefinitionViolation::MultipleHistory {
        state: node.id.to_string(),
    }))
}

fn final_is_leaf(node: &NodeOutline<'_>) -> Checked {
    check(
        (node.kind == NodeKind::Final && !node.children.is_empty()).then(|| {
            DefinitionViolation::FinalWithChildren {
                state: node.id.to_string(),
            }
        }),
    )
}
