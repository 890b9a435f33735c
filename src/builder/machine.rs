//! Builder for machines.

use crate::builder::error::BuildError;
use crate::builder::state::StateNodeBuilder;
use crate::builder::transition::TransitionBuilder;
use crate::config::MachineConfig;
use crate::core::{Action, Context, Spawner};
use crate::definition::{
    EventDescriptor, InvokeDefinition, NodeId, NodeKind, StateNode, StateTree,
    TransitionDefinition, STATE_IDENTIFIER,
};
use crate::machine::{ContextFactory, StateMachine};
use crate::validation::{self, NodeOutline};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use stillwater::validation::Validation;

/// Builder for a machine with a fluent API.
///
/// The machine itself is the root state: `initial`, `state`, `on` and the
/// other node methods apply to the root.
pub struct MachineBuilder<C: Context> {
    root: StateNodeBuilder<C>,
    factory: Option<ContextFactory<C>>,
    input: Value,
    config: MachineConfig,
}

impl<C: Context> MachineBuilder<C> {
    /// Create a new builder. `id` is the machine id and the root state id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            root: StateNodeBuilder::compound(id),
            factory: None,
            input: Value::Null,
            config: MachineConfig::default(),
        }
    }

    /// Set a fixed initial context.
    pub fn context(mut self, context: C) -> Self {
        self.factory = Some(Arc::new(move |_: &mut Spawner, _: &Value| context.clone()));
        self
    }

    /// Compute the initial context from the machine input. Actors spawned
    /// here are started with the machine.
    pub fn context_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&mut Spawner, &Value) -> C + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Input handed to the context factory.
    pub fn input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config = self.config.with_version(version);
        self
    }

    /// Make the root a parallel state whose children are regions.
    pub fn parallel(mut self) -> Self {
        self.root.kind = NodeKind::Parallel;
        self
    }

    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.root = self.root.initial(key);
        self
    }

    pub fn state(mut self, child: StateNodeBuilder<C>) -> Self {
        self.root = self.root.state(child);
        self
    }

    pub fn on(mut self, event: &str, transition: TransitionBuilder<C>) -> Self {
        self.root = self.root.on(event, transition);
        self
    }

    pub fn on_any(mut self, transition: TransitionBuilder<C>) -> Self {
        self.root = self.root.on_any(transition);
        self
    }

    pub fn always(mut self, transition: TransitionBuilder<C>) -> Self {
        self.root = self.root.always(transition);
        self
    }

    pub fn entry(mut self, action: Action<C>) -> Self {
        self.root = self.root.entry(action);
        self
    }

    pub fn exit(mut self, action: Action<C>) -> Self {
        self.root = self.root.exit(action);
        self
    }

    pub fn invoke(mut self, invoke: InvokeDefinition) -> Self {
        self.root = self.root.invoke(invoke);
        self
    }

    /// Build the machine.
    ///
    /// # Errors
    ///
    /// `MissingContext` when no context was given, `InvalidDefinition` with
    /// every structural violation otherwise.
    pub fn build(self) -> Result<StateMachine<C>, BuildError> {
        let factory = self.factory.ok_or(BuildError::MissingContext)?;
        let machine_id = self.root.key.clone();
        let delimiter = self.config.delimiter.clone();

        let mut drafts = Vec::new();
        flatten(self.root, None, None, 0, &delimiter, &mut drafts);
        let links = link(&drafts, &delimiter)?;
        let nodes = assemble(drafts, links);

        tracing::debug!(machine = %machine_id, nodes = nodes.len(), "built machine definition");

        let tree = StateTree::new(machine_id, delimiter, nodes);
        Ok(StateMachine::new(tree, factory, self.input, self.config))
    }
}

/// A node in pre-order with its links still unresolved.
struct Draft<C> {
    id: String,
    key: String,
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
    initial: Option<String>,
    on: Vec<(EventDescriptor, TransitionBuilder<C>)>,
    entry: Vec<Action<C>>,
    exit: Vec<Action<C>>,
    invoke: Vec<InvokeDefinition>,
    output: Option<Value>,
    history_targets: Vec<String>,
}

/// Resolved links of one draft, parallel to the draft list.
struct Links {
    initial: Option<usize>,
    targets: Vec<Vec<usize>>,
    history_default: Vec<usize>,
}

fn flatten<C>(
    builder: StateNodeBuilder<C>,
    parent: Option<usize>,
    parent_id: Option<&str>,
    depth: usize,
    delimiter: &str,
    out: &mut Vec<Draft<C>>,
) -> usize {
    let index = out.len();
    let kind = builder.effective_kind();
    let id = builder.id.unwrap_or_else(|| match parent_id {
        Some(parent_id) => format!("{parent_id}{delimiter}{}", builder.key),
        None => builder.key.clone(),
    });

    out.push(Draft {
        id: id.clone(),
        key: builder.key,
        kind,
        parent,
        children: Vec::new(),
        depth,
        initial: builder.initial,
        on: builder.on,
        entry: builder.entry,
        exit: builder.exit,
        invoke: builder.invoke,
        output: builder.output,
        history_targets: builder.history_targets,
    });

    let children = builder
        .children
        .into_iter()
        .map(|child| flatten(child, Some(index), Some(&id), depth + 1, delimiter, out))
        .collect();
    out[index].children = children;
    index
}

fn child_with_key<C>(drafts: &[Draft<C>], parent: usize, key: &str) -> Option<usize> {
    drafts[parent]
        .children
        .iter()
        .copied()
        .find(|&child| drafts[child].key == key)
}

fn resolve_target<C>(
    drafts: &[Draft<C>],
    ids: &HashMap<&str, usize>,
    source: usize,
    target: &str,
    delimiter: &str,
) -> Option<usize> {
    if let Some(id) = target.strip_prefix(STATE_IDENTIFIER) {
        return ids.get(id).copied();
    }
    let (start, path) = match target.strip_prefix(delimiter) {
        Some(path) => (source, path),
        None => (drafts[source].parent.unwrap_or(source), target),
    };
    path.split(delimiter)
        .try_fold(start, |node, key| child_with_key(drafts, node, key))
}

/// Resolve initial children and targets, reporting every violation.
fn link<C>(drafts: &[Draft<C>], delimiter: &str) -> Result<Vec<Links>, BuildError> {
    let mut ids: HashMap<&str, usize> = HashMap::new();
    for (index, draft) in drafts.iter().enumerate() {
        ids.entry(draft.id.as_str()).or_insert(index);
    }

    let mut links = Vec::with_capacity(drafts.len());
    let mut outlines = Vec::with_capacity(drafts.len());

    for (index, draft) in drafts.iter().enumerate() {
        let mut unresolved = Vec::new();

        let declared = draft.initial.as_deref().map(|key| {
            let child = child_with_key(drafts, index, key)
                .filter(|&child| !matches!(drafts[child].kind, NodeKind::History(_)));
            (key, child)
        });
        let initial = match declared {
            Some((_, child)) => child,
            None if draft.kind == NodeKind::Compound => draft
                .children
                .iter()
                .copied()
                .find(|&child| !matches!(drafts[child].kind, NodeKind::History(_))),
            None => None,
        };

        let mut targets = Vec::with_capacity(draft.on.len());
        let mut target_sets = Vec::new();
        for (event, transition) in &draft.on {
            let mut resolved = Vec::with_capacity(transition.targets.len());
            for target in &transition.targets {
                match resolve_target(drafts, &ids, index, target, delimiter) {
                    Some(node) => resolved.push(node),
                    None => unresolved.push((event.as_str().to_string(), target.as_str())),
                }
            }
            if resolved.len() > 1 {
                target_sets.push((event.as_str().to_string(), resolved.clone()));
            }
            targets.push(resolved);
        }

        let mut history_default = Vec::new();
        for target in &draft.history_targets {
            match resolve_target(drafts, &ids, index, target, delimiter) {
                Some(node) => history_default.push(node),
                None => unresolved.push(("history".to_string(), target.as_str())),
            }
        }

        outlines.push(NodeOutline {
            id: &draft.id,
            kind: draft.kind,
            parent: draft.parent,
            children: draft.children.clone(),
            initial: declared.map(|(key, child)| (key, child.is_some())),
            unresolved,
            target_sets,
        });
        links.push(Links {
            initial,
            targets,
            history_default,
        });
    }

    match validation::validate(&outlines) {
        Validation::Success(_) => Ok(links),
        Validation::Failure(errors) => {
            Err(BuildError::InvalidDefinition(errors.iter().cloned().collect()))
        }
    }
}

fn assemble<C>(drafts: Vec<Draft<C>>, links: Vec<Links>) -> Vec<StateNode<C>> {
    drafts
        .into_iter()
        .zip(links)
        .enumerate()
        .map(|(index, (draft, links))| {
            let source = NodeId(index);
            let mut on = Vec::new();
            let mut always = Vec::new();
            for ((event, transition), targets) in draft.on.into_iter().zip(links.targets) {
                let definition = TransitionDefinition {
                    source,
                    event,
                    targets: targets.into_iter().map(NodeId).collect(),
                    guard: transition.guard,
                    actions: transition.actions,
                    internal: transition.internal,
                };
                if definition.event == EventDescriptor::Always {
                    always.push(definition);
                } else {
                    on.push(definition);
                }
            }

            StateNode {
                id: draft.id,
                key: draft.key,
                kind: draft.kind,
                parent: draft.parent.map(NodeId),
                children: draft.children.into_iter().map(NodeId).collect(),
                depth: draft.depth,
                initial: links.initial.map(NodeId),
                history_default: links.history_default.into_iter().map(NodeId).collect(),
                on,
                always,
                entry: draft.entry,
                exit: draft.exit,
                invoke: draft.invoke,
                output: draft.output,
            }
        })
        .collect()
}
