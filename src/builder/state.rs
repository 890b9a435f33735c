//! Builder for state nodes.

use crate::builder::transition::TransitionBuilder;
use crate::core::{Action, HistoryKind};
use crate::definition::{EventDescriptor, InvokeDefinition, NodeKind};
use serde_json::Value;

/// Builder for one state node and its subtree.
///
/// Atomic and compound builders adjust to their content: an atomic builder
/// given child states becomes compound, and a compound builder without
/// children becomes atomic.
pub struct StateNodeBuilder<C> {
    pub(crate) key: String,
    pub(crate) id: Option<String>,
    pub(crate) kind: NodeKind,
    pub(crate) initial: Option<String>,
    pub(crate) children: Vec<StateNodeBuilder<C>>,
    pub(crate) on: Vec<(EventDescriptor, TransitionBuilder<C>)>,
    pub(crate) entry: Vec<Action<C>>,
    pub(crate) exit: Vec<Action<C>>,
    pub(crate) invoke: Vec<InvokeDefinition>,
    pub(crate) output: Option<Value>,
    pub(crate) history_targets: Vec<String>,
}

impl<C> StateNodeBuilder<C> {
    fn with_kind(key: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            key: key.into(),
            id: None,
            kind,
            initial: None,
            children: Vec::new(),
            on: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            invoke: Vec::new(),
            output: None,
            history_targets: Vec::new(),
        }
    }

    pub fn atomic(key: impl Into<String>) -> Self {
        Self::with_kind(key, NodeKind::Atomic)
    }

    pub fn compound(key: impl Into<String>) -> Self {
        Self::with_kind(key, NodeKind::Compound)
    }

    /// A parallel node; each child state is a region.
    pub fn parallel(key: impl Into<String>) -> Self {
        Self::with_kind(key, NodeKind::Parallel)
    }

    pub fn final_state(key: impl Into<String>) -> Self {
        Self::with_kind(key, NodeKind::Final)
    }

    /// A history pseudostate of its parent.
    pub fn history(key: impl Into<String>, kind: HistoryKind) -> Self {
        Self::with_kind(key, NodeKind::History(kind))
    }

    /// Override the generated id (the delimited path from the machine id).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Key of the initial child. Defaults to the first child.
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Add a child state.
    pub fn state(mut self, child: StateNodeBuilder<C>) -> Self {
        self.children.push(child);
        self
    }

    /// Add a transition on `event`. `"*"` matches any event and `""` makes
    /// the transition eventless.
    pub fn on(mut self, event: &str, transition: TransitionBuilder<C>) -> Self {
        self.on.push((EventDescriptor::parse(event), transition));
        self
    }

    /// Add a wildcard transition, tried after every named one.
    pub fn on_any(mut self, transition: TransitionBuilder<C>) -> Self {
        self.on.push((EventDescriptor::Wildcard, transition));
        self
    }

    /// Add an eventless transition, checked after every microstep.
    pub fn always(mut self, transition: TransitionBuilder<C>) -> Self {
        self.on.push((EventDescriptor::Always, transition));
        self
    }

    pub fn entry(mut self, action: Action<C>) -> Self {
        self.entry.push(action);
        self
    }

    pub fn exit(mut self, action: Action<C>) -> Self {
        self.exit.push(action);
        self
    }

    /// Start a child actor while this state is active.
    pub fn invoke(mut self, invoke: InvokeDefinition) -> Self {
        self.invoke.push(invoke);
        self
    }

    /// Done data of a final state.
    pub fn output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Default target of a history pseudostate without a record.
    pub fn history_target(mut self, target: impl Into<String>) -> Self {
        self.history_targets.push(target.into());
        self
    }

    /// The kind this builder produces, given its children.
    pub(crate) fn effective_kind(&self) -> NodeKind {
        match self.kind {
            NodeKind::Atomic if !self.children.is_empty() => NodeKind::Compound,
            NodeKind::Compound if self.children.is_empty() => NodeKind::Atomic,
            kind => kind,
        }
    }
}
