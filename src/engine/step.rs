//! The step executor: one atomic application of a transition set.

use super::resolve::{add_ancestors, add_descendants, resolve};
use super::select::{exit_set, transition_domain};
use crate::core::{
    Action, ActorRef, Configuration, Context, Effect, Event, HistoryKind, HistoryValue, Snapshot,
    Spawner,
};
use crate::definition::{NodeId, StateTree, TransitionDefinition};
use crate::error::StatechartError;
use std::collections::{BTreeMap, BTreeSet};

/// Output of one microstep.
#[derive(Debug)]
pub struct Step<C: Context> {
    pub snapshot: Snapshot<C>,
    /// Events raised by the step's actions, in raise order.
    pub raised: Vec<Event>,
}

/// Apply `transitions` to `snapshot`.
///
/// Exit actions run innermost first, then each transition's actions in
/// selection order, then entry actions outermost first. Actors owned by an
/// exited node are stopped right after that node's exit actions. The input
/// snapshot is left untouched; on error nothing of the step is kept.
///
/// # Errors
///
/// `ActionFailed` when an action returns an error, `InvalidStateValue` when
/// the entered nodes cannot be default-completed.
pub fn microstep<C: Context>(
    tree: &StateTree<C>,
    snapshot: &Snapshot<C>,
    transitions: &[&TransitionDefinition<C>],
    event: &Event,
) -> Result<Step<C>, StatechartError> {
    let current = &snapshot.configuration;

    let mut exiting = BTreeSet::new();
    for transition in transitions {
        exiting.extend(exit_set(tree, current, transition));
    }

    let history = record_history(tree, current, &exiting, &snapshot.history_value);

    let mut entering = Configuration::new();
    for transition in transitions {
        let Some(domain) = transition_domain(tree, transition) else {
            continue;
        };
        for &target in transition.targets() {
            add_descendants(tree, target, &history, &mut entering)?;
        }
        for &target in transition.targets() {
            add_ancestors(tree, target, domain, &history, &mut entering)?;
        }
    }
    // Nodes that stay active are not re-entered.
    let entering: Vec<NodeId> = entering
        .iter()
        .filter(|&node| !current.contains(node) || exiting.contains(&node))
        .collect();

    let mut run = Execution::new(
        tree,
        snapshot.context.clone(),
        snapshot.children.clone(),
        Vec::new(),
    );
    let mut next = current.clone();

    for &node in exiting.iter().rev() {
        let state = tree.node(node);
        run.run_actions(state.exit(), event, None)?;
        run.stop_owned(state.id());
        next.remove(node);
    }

    for transition in transitions {
        run.run_actions(transition.actions(), event, None)?;
    }

    run.enter(&entering, event, &mut next)?;

    tracing::debug!(
        event = %event.name,
        exited = ?node_ids(tree, exiting.iter().rev().copied()),
        entered = ?node_ids(tree, entering.iter().copied()),
        "microstep"
    );

    run.finish(next, history, event, snapshot.session_id.clone())
}

/// Enter the machine's initial configuration.
///
/// `children` and `effects` carry the actors spawned while the context was
/// built, so their start effects lead the initial snapshot's action list.
pub(crate) fn enter_initial<C: Context>(
    tree: &StateTree<C>,
    context: C,
    children: BTreeMap<String, ActorRef>,
    effects: Vec<Effect>,
    event: &Event,
    session_id: Option<String>,
) -> Result<Step<C>, StatechartError> {
    let history = HistoryValue::new();
    let mut entering = Configuration::new();
    add_descendants(tree, tree.root(), &history, &mut entering)?;
    let entering: Vec<NodeId> = entering.iter().collect();

    let mut run = Execution::new(tree, context, children, effects);
    let mut next = Configuration::new();
    run.enter(&entering, event, &mut next)?;

    tracing::debug!(
        machine = %tree.machine_id(),
        entered = ?node_ids(tree, entering.iter().copied()),
        "entered initial configuration"
    );

    run.finish(next, history, event, session_id)
}

fn record_history<C>(
    tree: &StateTree<C>,
    current: &Configuration,
    exiting: &BTreeSet<NodeId>,
    history: &HistoryValue,
) -> HistoryValue {
    let mut history = history.clone();
    for &node in exiting {
        let Some(kind) = tree
            .history_child(node)
            .and_then(|pseudo| tree.node(pseudo).history_kind())
        else {
            continue;
        };
        let recorded: Vec<String> = match kind {
            HistoryKind::Shallow => tree
                .regions(node)
                .filter(|&child| current.contains(child))
                .map(|child| tree.node(child).id().to_string())
                .collect(),
            HistoryKind::Deep => current
                .iter()
                .filter(|&active| tree.node(active).is_atomic() && tree.is_descendant(active, node))
                .map(|active| tree.node(active).id().to_string())
                .collect(),
        };
        history = history.record(tree.node(node).id(), recorded);
    }
    history
}

fn node_ids<C>(tree: &StateTree<C>, nodes: impl Iterator<Item = NodeId>) -> Vec<&str> {
    nodes.map(|node| tree.node(node).id()).collect()
}

/// Mutable state threaded through the actions of one step.
struct Execution<'t, C> {
    tree: &'t StateTree<C>,
    context: C,
    children: BTreeMap<String, ActorRef>,
    effects: Vec<Effect>,
    raised: Vec<Event>,
}

impl<'t, C: Context> Execution<'t, C> {
    fn new(
        tree: &'t StateTree<C>,
        context: C,
        children: BTreeMap<String, ActorRef>,
        effects: Vec<Effect>,
    ) -> Self {
        Self {
            tree,
            context,
            children,
            effects,
            raised: Vec::new(),
        }
    }

    fn run_actions(
        &mut self,
        actions: &[Action<C>],
        event: &Event,
        owner: Option<&str>,
    ) -> Result<(), StatechartError> {
        for action in actions {
            match action {
                Action::Assign(assigner) => {
                    let mut spawner = self.spawner(owner);
                    let next = assigner(&self.context, event, &mut spawner).map_err(|source| {
                        StatechartError::ActionFailed {
                            action: action.label(),
                            source,
                        }
                    })?;
                    self.context = next;
                    self.start_actors(spawner.into_requests());
                }
                Action::Raise(raised) => self.raised.push(raised.clone()),
                Action::SendTo {
                    target,
                    event,
                    delay,
                } => self.effects.push(Effect::SendTo {
                    target: target.clone(),
                    event: event.clone(),
                    delay: *delay,
                }),
                Action::Spawn { src, id, input } => {
                    let mut spawner = self.spawner(owner);
                    match id {
                        Some(id) => spawner.spawn_with_id(id.clone(), src.clone(), input.clone()),
                        None => spawner.spawn(src.clone(), input.clone()),
                    };
                    self.start_actors(spawner.into_requests());
                }
                Action::Stop { id } => self.stop_actor(id),
                Action::Perform { kind, params } => self.effects.push(Effect::Custom {
                    kind: kind.clone(),
                    params: params.clone(),
                }),
            }
        }
        Ok(())
    }

    fn spawner(&self, owner: Option<&str>) -> Spawner {
        Spawner::new(owner.map(str::to_string), self.children.keys())
    }

    fn start_actors(&mut self, actors: Vec<ActorRef>) {
        for actor in actors {
            if self.children.contains_key(actor.id()) {
                tracing::warn!(actor = %actor.id(), "replacing running actor with the same id");
                self.stop_actor(actor.id());
            }
            self.children.insert(actor.id().to_string(), actor.clone());
            self.effects.push(Effect::StartActor { actor });
        }
    }

    fn stop_actor(&mut self, id: &str) {
        if self.children.remove(id).is_some() {
            self.effects.push(Effect::StopActor { id: id.to_string() });
        } else {
            tracing::trace!(actor = %id, "stop ignored for unknown actor");
        }
    }

    fn stop_owned(&mut self, owner: &str) {
        let owned: Vec<String> = self
            .children
            .values()
            .filter(|actor| actor.owner() == Some(owner))
            .map(|actor| actor.id().to_string())
            .collect();
        for id in owned {
            self.stop_actor(&id);
        }
    }

    fn enter(
        &mut self,
        entering: &[NodeId],
        event: &Event,
        next: &mut Configuration,
    ) -> Result<(), StatechartError> {
        let tree = self.tree;
        for &node in entering {
            let state = tree.node(node);
            next.insert(node);
            self.run_actions(state.entry(), event, Some(state.id()))?;

            let mut spawner = self.spawner(Some(state.id()));
            for (index, invoke) in state.invocations().iter().enumerate() {
                let id = invoke
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}:invocation[{index}]", state.id()));
                spawner.spawn_with_id(id, invoke.src.clone(), invoke.input.clone());
            }
            self.start_actors(spawner.into_requests());

            if state.is_final() {
                self.raise_done(node, next);
            }
        }
        Ok(())
    }

    /// Raise completion events for the parent of an entered final node and,
    /// when that completes a parallel grandparent, for the grandparent.
    fn raise_done(&mut self, final_node: NodeId, next: &Configuration) {
        let tree = self.tree;
        let Some(parent) = tree.node(final_node).parent() else {
            return;
        };
        if parent == tree.root() {
            return;
        }
        let output = tree.node(final_node).output().cloned();
        self.raised
            .push(Event::done_state(tree.node(parent).id(), output));

        if let Some(grandparent) = tree.node(parent).parent() {
            if tree.node(grandparent).is_parallel() && tree.is_in_final_state(grandparent, next) {
                self.raised
                    .push(Event::done_state(tree.node(grandparent).id(), None));
            }
        }
    }

    fn finish(
        self,
        next: Configuration,
        history: HistoryValue,
        event: &Event,
        session_id: Option<String>,
    ) -> Result<Step<C>, StatechartError> {
        let tree = self.tree;
        let value = tree.state_value(&next);
        let configuration = resolve(tree, &value, &history)?;
        let done = tree.is_in_final_state(tree.root(), &configuration);
        let output = if done {
            tracing::info!(machine = %tree.machine_id(), "machine reached a final state");
            tree.final_output(&configuration)
        } else {
            None
        };

        Ok(Step {
            snapshot: Snapshot {
                value,
                context: self.context,
                configuration,
                actions: self.effects,
                children: self.children,
                history_value: history,
                done,
                output,
                event: event.clone(),
                session_id,
                delimiter: tree.delimiter().to_string(),
            },
            raised: self.raised,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MachineBuilder, StateNodeBuilder, TransitionBuilder};
    use crate::core::{ActionError, StateValue};
    use crate::definition::InvokeDefinition;
    use crate::engine::{select, Probe};
    use crate::machine::StateMachine;
    use serde_json::{json, Value};

    fn log(entry: &'static str) -> Action<Vec<String>> {
        Action::assign(move |log: &Vec<String>, _: &Event| {
            let mut next = log.clone();
            next.push(entry.to_string());
            next
        })
    }

    fn nested() -> StateMachine<Vec<String>> {
        MachineBuilder::new("m")
            .context(Vec::new())
            .initial("a")
            .state(
                StateNodeBuilder::compound("a")
                    .initial("b")
                    .exit(log("exit a"))
                    .entry(log("enter a"))
                    .state(
                        StateNodeBuilder::atomic("b")
                            .exit(log("exit b"))
                            .on("NEXT", TransitionBuilder::to("c").action(log("transition")))
                            .on("OUT", TransitionBuilder::to("#m.d").action(log("transition"))),
                    )
                    .state(StateNodeBuilder::atomic("c").entry(log("enter c"))),
            )
            .state(StateNodeBuilder::atomic("d").entry(log("enter d")))
            .build()
            .unwrap()
    }

    fn step(
        machine: &StateMachine<Vec<String>>,
        snapshot: &Snapshot<Vec<String>>,
        name: &str,
    ) -> Step<Vec<String>> {
        let tree = machine.definition();
        let event = Event::new(name);
        let selected = select(tree, &snapshot.configuration, &snapshot.context, &event, Probe::Event)
            .unwrap();
        microstep(tree, snapshot, &selected, &event).unwrap()
    }

    fn cleared(machine: &StateMachine<Vec<String>>) -> Snapshot<Vec<String>> {
        let initial = machine.initial_snapshot(None).unwrap();
        let mut snapshot = (*initial).clone();
        snapshot.context = Vec::new();
        snapshot
    }

    #[test]
    fn sibling_transition_keeps_parent_active() {
        let machine = nested();
        let result = step(&machine, &cleared(&machine), "NEXT");

        assert_eq!(result.snapshot.context, vec!["exit b", "transition", "enter c"]);
        assert_eq!(result.snapshot.value, StateValue::branch("a", "c"));
    }

    #[test]
    fn leaving_the_parent_exits_child_first() {
        let machine = nested();
        let result = step(&machine, &cleared(&machine), "OUT");

        assert_eq!(
            result.snapshot.context,
            vec!["exit b", "exit a", "transition", "enter d"]
        );
        assert_eq!(result.snapshot.value, StateValue::from("d"));
    }

    #[test]
    fn initial_entry_runs_parent_before_child() {
        let machine = nested();
        let initial = machine.initial_snapshot(None).unwrap();

        assert_eq!(initial.context(), &vec!["enter a".to_string()]);
        assert_eq!(initial.value(), &StateValue::branch("a", "b"));
    }

    #[test]
    fn input_snapshot_is_untouched() {
        let machine = nested();
        let before = cleared(&machine);
        let copy = before.clone();
        let _ = step(&machine, &before, "NEXT");

        assert_eq!(before, copy);
    }

    #[test]
    fn failing_action_aborts_the_step() {
        let machine: StateMachine<u32> = MachineBuilder::new("m")
            .context(0)
            .initial("a")
            .state(StateNodeBuilder::atomic("a").on(
                "GO",
                TransitionBuilder::to("b").action(Action::try_assign(|_: &u32, _: &Event| {
                    Err(ActionError::new("no"))
                })),
            ))
            .state(StateNodeBuilder::atomic("b"))
            .build()
            .unwrap();
        let tree = machine.definition();
        let snapshot = machine.initial_snapshot(None).unwrap();
        let event = Event::new("GO");
        let selected =
            select(tree, &snapshot.configuration, &snapshot.context, &event, Probe::Event).unwrap();

        let err = microstep(tree, &snapshot, &selected, &event).unwrap_err();
        assert!(matches!(err, StatechartError::ActionFailed { ref action, .. } if action == "assign"));
    }

    #[test]
    fn invocations_start_on_entry_and_stop_on_exit() {
        let machine: StateMachine<Value> = MachineBuilder::new("m")
            .context(Value::Null)
            .initial("idle")
            .state(StateNodeBuilder::atomic("idle").on("FETCH", TransitionBuilder::to("loading")))
            .state(
                StateNodeBuilder::atomic("loading")
                    .invoke(InvokeDefinition {
                        src: "fetcher".to_string(),
                        id: None,
                        input: json!({ "url": "/items" }),
                    })
                    .on("CANCEL", TransitionBuilder::to("idle")),
            )
            .build()
            .unwrap();
        let tree = machine.definition();
        let idle = machine.initial_snapshot(None).unwrap();

        let fetch = Event::new("FETCH");
        let selected = select(tree, &idle.configuration, &idle.context, &fetch, Probe::Event).unwrap();
        let loading = microstep(tree, &idle, &selected, &fetch).unwrap().snapshot;

        let id = "m.loading:invocation[0]";
        assert!(loading.children.contains_key(id));
        assert!(matches!(
            &loading.actions[..],
            [Effect::StartActor { actor }] if actor.id() == id && actor.owner() == Some("m.loading")
        ));

        let cancel = Event::new("CANCEL");
        let selected =
            select(tree, &loading.configuration, &loading.context, &cancel, Probe::Event).unwrap();
        let stopped = microstep(tree, &loading, &selected, &cancel).unwrap().snapshot;

        assert!(stopped.children.is_empty());
        assert_eq!(stopped.actions, vec![Effect::StopActor { id: id.to_string() }]);
    }

    #[test]
    fn stopping_an_unknown_actor_is_a_no_op() {
        let machine: StateMachine<Value> = MachineBuilder::new("m")
            .context(Value::Null)
            .initial("a")
            .state(StateNodeBuilder::atomic("a").on(
                "GO",
                TransitionBuilder::targetless().action(Action::stop("ghost")),
            ))
            .build()
            .unwrap();
        let tree = machine.definition();
        let snapshot = machine.initial_snapshot(None).unwrap();
        let event = Event::new("GO");
        let selected =
            select(tree, &snapshot.configuration, &snapshot.context, &event, Probe::Event).unwrap();
        let result = microstep(tree, &snapshot, &selected, &event).unwrap();

        assert!(result.snapshot.actions.is_empty());
        assert_eq!(result.snapshot.value, snapshot.value);
    }

    #[test]
    fn final_child_raises_done_event() {
        let machine: StateMachine<Value> = MachineBuilder::new("job")
            .context(Value::Null)
            .initial("work")
            .state(
                StateNodeBuilder::compound("work")
                    .initial("running")
                    .state(StateNodeBuilder::atomic("running").on("FINISH", TransitionBuilder::to("finished")))
                    .state(StateNodeBuilder::final_state("finished").output(json!({ "ok": true }))),
            )
            .build()
            .unwrap();
        let tree = machine.definition();
        let snapshot = machine.initial_snapshot(None).unwrap();
        let event = Event::new("FINISH");
        let selected =
            select(tree, &snapshot.configuration, &snapshot.context, &event, Probe::Event).unwrap();
        let result = microstep(tree, &snapshot, &selected, &event).unwrap();

        assert_eq!(result.raised.len(), 1);
        assert_eq!(result.raised[0].name, "done.state.job.work");
        assert_eq!(result.raised[0].data, json!({ "ok": true }));
        assert!(!result.snapshot.done);
    }
}
