//! The machine: a definition tree plus the operations callers drive it with.

use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::config::MachineConfig;
use crate::core::{
    ActorContext, ActorRef, Configuration, Context, Effect, Event, HistoryValue, Snapshot,
    Spawner, StateValue, Status, INIT_EVENT, NULL_EVENT,
};
use crate::definition::{EventDescriptor, StateNode, StateTree, TransitionDefinition};
use crate::engine::{self, Macrostep, Probe};
use crate::error::StatechartError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ptr;
use std::sync::Arc;

/// Builds the initial context. Actors spawned here start with the machine.
pub type ContextFactory<C> = Arc<dyn Fn(&mut Spawner, &Value) -> C + Send + Sync>;

/// What a transition starts from: a snapshot, or a bare state value that is
/// resolved against the machine first.
#[derive(Debug, Clone)]
pub enum StateInput<C: Context> {
    Snapshot(Arc<Snapshot<C>>),
    Value(StateValue),
}

impl<C: Context> From<Arc<Snapshot<C>>> for StateInput<C> {
    fn from(snapshot: Arc<Snapshot<C>>) -> Self {
        StateInput::Snapshot(snapshot)
    }
}

impl<C: Context> From<&Arc<Snapshot<C>>> for StateInput<C> {
    fn from(snapshot: &Arc<Snapshot<C>>) -> Self {
        StateInput::Snapshot(Arc::clone(snapshot))
    }
}

impl<C: Context> From<Snapshot<C>> for StateInput<C> {
    fn from(snapshot: Snapshot<C>) -> Self {
        StateInput::Snapshot(Arc::new(snapshot))
    }
}

impl<C: Context> From<StateValue> for StateInput<C> {
    fn from(value: StateValue) -> Self {
        StateInput::Value(value)
    }
}

impl<C: Context> From<&str> for StateInput<C> {
    fn from(value: &str) -> Self {
        StateInput::Value(StateValue::from(value))
    }
}

/// A statechart definition and its pure transition function.
///
/// The machine itself holds no running state: every operation takes a
/// snapshot (or a state value) and returns a new snapshot behind an `Arc`.
/// Cloning a machine is cheap; the definition tree is shared.
///
/// # Example
///
/// ```rust
/// use harel::builder::{MachineBuilder, StateNodeBuilder, TransitionBuilder};
/// use harel::core::StateValue;
///
/// let machine = MachineBuilder::new("toggle")
///     .context(0u32)
///     .initial("off")
///     .state(StateNodeBuilder::atomic("off").on("FLIP", TransitionBuilder::to("on")))
///     .state(StateNodeBuilder::atomic("on").on("FLIP", TransitionBuilder::to("off")))
///     .build()
///     .unwrap();
///
/// let off = machine.initial_snapshot(None).unwrap();
/// let on = machine.transition(&off, "FLIP", None).unwrap();
/// assert_eq!(on.value(), &StateValue::from("on"));
/// ```
pub struct StateMachine<C: Context> {
    tree: Arc<StateTree<C>>,
    factory: ContextFactory<C>,
    input: Value,
    config: MachineConfig,
}

impl<C: Context> StateMachine<C> {
    pub(crate) fn new(
        tree: StateTree<C>,
        factory: ContextFactory<C>,
        input: Value,
        config: MachineConfig,
    ) -> Self {
        Self {
            tree: Arc::new(tree),
            factory,
            input,
            config,
        }
    }

    pub fn id(&self) -> &str {
        self.tree.machine_id()
    }

    pub fn version(&self) -> Option<&str> {
        self.config.version.as_deref()
    }

    /// The static definition tree.
    pub fn definition(&self) -> &StateTree<C> {
        &self.tree
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    /// The same machine with a fixed initial context.
    pub fn with_context(&self, context: C) -> Self {
        Self {
            factory: Arc::new(move |_: &mut Spawner, _: &Value| context.clone()),
            ..self.clone()
        }
    }

    /// The same machine with a different input for the context factory.
    pub fn with_input(&self, input: Value) -> Self {
        Self {
            input,
            ..self.clone()
        }
    }

    /// The same machine with a different configuration. The delimiter is
    /// fixed when the tree is built and is kept.
    pub fn with_config(&self, config: MachineConfig) -> Self {
        let delimiter = self.tree.delimiter().to_string();
        if config.delimiter != delimiter {
            tracing::warn!(
                machine = %self.id(),
                requested = %config.delimiter,
                kept = %delimiter,
                "delimiter cannot change after build"
            );
        }
        Self {
            config: MachineConfig { delimiter, ..config },
            ..self.clone()
        }
    }

    /// Enter the initial configuration and settle it.
    ///
    /// The context factory runs first; actors it spawns are announced by
    /// leading `StartActor` effects. Eventless transitions and events raised
    /// by entry actions are drained before the snapshot is returned.
    ///
    /// # Errors
    ///
    /// Any entry action failure, or `MaxStepsExceeded` while settling.
    pub fn initial_snapshot(
        &self,
        actor: Option<&ActorContext>,
    ) -> Result<Arc<Snapshot<C>>, StatechartError> {
        let (context, children, effects) = self.create_context();
        let event = Event::init(self.input.clone());
        let first = engine::enter_initial(
            &self.tree,
            context,
            children,
            effects,
            &event,
            actor.map(|actor| actor.session_id.clone()),
        )?;
        let settled = engine::drive(&self.tree, first, self.config.max_microsteps)?;
        Ok(settled.snapshot)
    }

    /// Process `event` and return the settled snapshot.
    ///
    /// When no transition is enabled the input snapshot itself is returned.
    ///
    /// # Errors
    ///
    /// `UnhandledErrorEvent` for an error event no active state names,
    /// `InvalidStateValue` for an unresolvable value input,
    /// `MaxStepsExceeded`, `GuardFailed` and `ActionFailed`.
    pub fn transition(
        &self,
        state: impl Into<StateInput<C>>,
        event: impl Into<Event>,
        actor: Option<&ActorContext>,
    ) -> Result<Arc<Snapshot<C>>, StatechartError> {
        self.macrostep(state, event, actor)
            .map(|result| result.snapshot)
    }

    /// Process `event`, returning the settled snapshot and every microstate.
    pub fn macrostep(
        &self,
        state: impl Into<StateInput<C>>,
        event: impl Into<Event>,
        actor: Option<&ActorContext>,
    ) -> Result<Macrostep<C>, StatechartError> {
        let state = state.into();
        let restored = matches!(state, StateInput::Value(_));
        let snapshot = self.snapshot_for(state, actor)?;
        let event = event.into();

        if event.is_error() && !snapshot.done && !self.names_event(&snapshot, &event.name) {
            return Err(StatechartError::UnhandledErrorEvent {
                event: event.name,
                data: event.data,
            });
        }

        let result = engine::macrostep(&self.tree, &snapshot, &event, self.config.max_microsteps)?;
        // Actors started by the context factory of a restored value lead the trace.
        if restored && !result.is_unchanged() && !snapshot.actions.is_empty() {
            return Ok(result.with_leading_actions(&snapshot.actions));
        }
        Ok(result)
    }

    /// The intermediate snapshots `event` produces, in step order.
    pub fn microstep(
        &self,
        state: impl Into<StateInput<C>>,
        event: impl Into<Event>,
        actor: Option<&ActorContext>,
    ) -> Result<Vec<Arc<Snapshot<C>>>, StatechartError> {
        self.macrostep(state, event, actor)
            .map(|result| result.microstates)
    }

    /// Recompute value and configuration of `snapshot` from its value.
    ///
    /// # Errors
    ///
    /// `InvalidStateValue` when the value does not fit this definition.
    pub fn resolve_state(&self, snapshot: &Snapshot<C>) -> Result<Arc<Snapshot<C>>, StatechartError> {
        let configuration =
            engine::resolve(&self.tree, &snapshot.value, &snapshot.history_value)?;
        Ok(Arc::new(self.assemble(
            configuration,
            snapshot.context.clone(),
            snapshot.children.clone(),
            Vec::new(),
            snapshot.history_value.clone(),
            snapshot.event.clone(),
            snapshot.session_id.clone(),
        )))
    }

    /// A snapshot for a bare value with the machine's initial context.
    pub fn resolve_state_value(&self, value: &StateValue) -> Result<Arc<Snapshot<C>>, StatechartError> {
        self.restore_value(value.clone(), None)
    }

    /// Rebuild a snapshot from a bare value, building the context with the
    /// context factory. No entry actions run.
    pub fn restore_value(
        &self,
        value: StateValue,
        actor: Option<&ActorContext>,
    ) -> Result<Arc<Snapshot<C>>, StatechartError> {
        let history = HistoryValue::new();
        let configuration = engine::resolve(&self.tree, &value, &history)?;
        let (context, children, effects) = self.create_context();
        Ok(Arc::new(self.assemble(
            configuration,
            context,
            children,
            effects,
            history,
            Event::new(INIT_EVENT),
            actor.map(|actor| actor.session_id.clone()),
        )))
    }

    /// Rebuild a snapshot from a checkpoint. Restored children are announced
    /// again with `StartActor` effects so the host can recreate them.
    ///
    /// # Errors
    ///
    /// `Checkpoint(ValidationFailed)` when the checkpoint belongs to another
    /// machine, `InvalidStateValue` when its value does not resolve.
    pub fn restore_state(
        &self,
        checkpoint: &Checkpoint<C>,
        actor: Option<&ActorContext>,
    ) -> Result<Arc<Snapshot<C>>, StatechartError> {
        if checkpoint.machine_id != self.id() {
            return Err(CheckpointError::ValidationFailed(format!(
                "checkpoint of machine '{}' cannot restore '{}'",
                checkpoint.machine_id,
                self.id()
            ))
            .into());
        }
        if checkpoint.machine_version.as_deref() != self.version() {
            tracing::warn!(
                machine = %self.id(),
                checkpoint_version = ?checkpoint.machine_version,
                machine_version = ?self.version(),
                "restoring checkpoint from a different machine version"
            );
        }

        let configuration =
            engine::resolve(&self.tree, &checkpoint.value, &checkpoint.history_value)?;
        let effects = checkpoint
            .children
            .values()
            .map(|actor| Effect::StartActor {
                actor: actor.clone(),
            })
            .collect();
        Ok(Arc::new(self.assemble(
            configuration,
            checkpoint.context.clone(),
            checkpoint.children.clone(),
            effects,
            checkpoint.history_value.clone(),
            Event::new(INIT_EVENT),
            actor.map(|actor| actor.session_id.clone()),
        )))
    }

    /// Capture a snapshot for persistence.
    pub fn checkpoint(&self, snapshot: &Snapshot<C>) -> Checkpoint<C> {
        Checkpoint::capture(self.id(), self.version(), snapshot)
    }

    /// Transitions of the active configuration that respond to `event`.
    ///
    /// Guards are not evaluated, so this lists transitions that exist even
    /// when none would fire. An event named `""` lists eventless ones.
    pub fn transition_candidates<'a>(
        &'a self,
        snapshot: &Snapshot<C>,
        event: &Event,
    ) -> Vec<&'a TransitionDefinition<C>> {
        let probe = if event.name == NULL_EVENT {
            Probe::Eventless
        } else {
            Probe::Event
        };
        let tree: &'a StateTree<C> = &self.tree;
        let mut candidates: Vec<&'a TransitionDefinition<C>> = Vec::new();

        for atomic in tree.atomic_nodes(&snapshot.configuration) {
            let chain = std::iter::once(atomic).chain(tree.proper_ancestors(atomic, None));
            for node in chain {
                for transition in engine::matching(tree.node(node), event, probe) {
                    if !candidates.iter().any(|&seen| ptr::eq(seen, transition)) {
                        candidates.push(transition);
                    }
                }
            }
        }
        candidates
    }

    /// Find a state node by id (with or without the `#` prefix).
    ///
    /// # Errors
    ///
    /// `UnknownStateId` when no node has that id.
    pub fn lookup_node_by_id(&self, id: &str) -> Result<&StateNode<C>, StatechartError> {
        self.tree.lookup(id).map(|node| self.tree.node(node))
    }

    /// Whether the node with `id` is active in `snapshot`.
    pub fn is_in(&self, snapshot: &Snapshot<C>, id: &str) -> bool {
        self.tree
            .find(id)
            .is_some_and(|node| snapshot.configuration.contains(node))
    }

    /// Names of the explicit events the active configuration declares,
    /// sorted and without duplicates.
    pub fn next_events(&self, snapshot: &Snapshot<C>) -> Vec<String> {
        snapshot
            .configuration
            .iter()
            .flat_map(|node| self.tree.node(node).transitions())
            .filter_map(|transition| match transition.event() {
                EventDescriptor::Named(name) => Some(name.clone()),
                _ => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn status(&self, snapshot: &Snapshot<C>) -> Status {
        snapshot.status()
    }

    fn names_event(&self, snapshot: &Snapshot<C>, name: &str) -> bool {
        snapshot.configuration.iter().any(|node| {
            self.tree
                .node(node)
                .transitions()
                .iter()
                .any(|transition| matches!(transition.event(), EventDescriptor::Named(n) if n == name))
        })
    }

    fn snapshot_for(
        &self,
        state: StateInput<C>,
        actor: Option<&ActorContext>,
    ) -> Result<Arc<Snapshot<C>>, StatechartError> {
        match state {
            StateInput::Snapshot(snapshot) => {
                if let Some(stray) = snapshot
                    .configuration
                    .iter()
                    .find(|&node| self.tree.get(node).is_none())
                {
                    return Err(StatechartError::invalid_value(format!(
                        "snapshot refers to node {stray} outside machine '{}'",
                        self.id()
                    )));
                }
                Ok(snapshot)
            }
            StateInput::Value(value) => self.restore_value(value, actor),
        }
    }

    fn create_context(&self) -> (C, BTreeMap<String, ActorRef>, Vec<Effect>) {
        let mut spawner = Spawner::detached();
        let context = (self.factory)(&mut spawner, &self.input);
        let mut children = BTreeMap::new();
        let mut effects = Vec::new();
        for actor in spawner.into_requests() {
            effects.push(Effect::StartActor {
                actor: actor.clone(),
            });
            children.insert(actor.id().to_string(), actor);
        }
        (context, children, effects)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        configuration: Configuration,
        context: C,
        children: BTreeMap<String, ActorRef>,
        actions: Vec<Effect>,
        history_value: HistoryValue,
        event: Event,
        session_id: Option<String>,
    ) -> Snapshot<C> {
        let tree = &self.tree;
        let done = tree.is_in_final_state(tree.root(), &configuration);
        let output = if done { tree.final_output(&configuration) } else { None };
        Snapshot {
            value: tree.state_value(&configuration),
            context,
            configuration,
            actions,
            children,
            history_value,
            done,
            output,
            event,
            session_id,
            delimiter: tree.delimiter().to_string(),
        }
    }
}

impl<C: Context> Clone for StateMachine<C> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            factory: Arc::clone(&self.factory),
            input: self.input.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: Context> fmt::Debug for StateMachine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("id", &self.id())
            .field("config", &self.config)
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}
