//! End-to-end tests driving machines through the public API.

use harel::builder::{MachineBuilder, StateNodeBuilder, TransitionBuilder};
use harel::core::{Action, Effect, Event, Guard, HistoryKind, Spawner, StateValue, Status};
use harel::{Checkpoint, MachineConfig, StateMachine, StatechartError};
use serde_json::{json, Value};
use std::sync::Arc;

fn fetch_machine(has_permission: bool) -> StateMachine<Value> {
    MachineBuilder::new("fetch")
        .context(json!({ "hasPermission": has_permission, "ready": false }))
        .initial("idle")
        .state(
            StateNodeBuilder::atomic("idle").on(
                "FETCH",
                TransitionBuilder::to("loading").guard(Guard::named(
                    "hasPermission",
                    |ctx: &Value, _: &Event| ctx["hasPermission"] == true,
                )),
            ),
        )
        .state(
            StateNodeBuilder::atomic("loading")
                .entry(Action::assign(|ctx: &Value, _: &Event| {
                    let mut next = ctx.clone();
                    next["ready"] = json!(true);
                    next
                }))
                .always(
                    TransitionBuilder::to("success")
                        .when(|ctx: &Value, _: &Event| ctx["ready"] == true),
                )
                .on("FAIL", TransitionBuilder::to("failure")),
        )
        .state(StateNodeBuilder::final_state("success"))
        .state(StateNodeBuilder::final_state("failure"))
        .build()
        .unwrap()
}

fn log(entry: &'static str) -> Action<Vec<String>> {
    Action::assign(move |log: &Vec<String>, _: &Event| {
        let mut next = log.clone();
        next.push(entry.to_string());
        next
    })
}

fn player(kind: HistoryKind) -> StateMachine<Value> {
    MachineBuilder::new("player")
        .context(json!({}))
        .initial("on")
        .state(
            StateNodeBuilder::compound("on")
                .initial("playing")
                .state(
                    StateNodeBuilder::compound("playing")
                        .initial("track1")
                        .state(StateNodeBuilder::atomic("track1").on("NEXT", TransitionBuilder::to("track2")))
                        .state(StateNodeBuilder::atomic("track2"))
                        .on("PAUSE", TransitionBuilder::to("paused")),
                )
                .state(StateNodeBuilder::atomic("paused").on("PLAY", TransitionBuilder::to("playing")))
                .state(StateNodeBuilder::history("hist", kind))
                .on("POWER", TransitionBuilder::to("off")),
        )
        .state(StateNodeBuilder::atomic("off").on("POWER", TransitionBuilder::to("on.hist")))
        .build()
        .unwrap()
}

#[test]
fn permitted_fetch_settles_in_success_after_two_microsteps() {
    let machine = fetch_machine(true);
    let idle = machine.initial_snapshot(None).unwrap();
    assert!(idle.matches("idle"));

    let result = machine.macrostep(&idle, "FETCH", None).unwrap();

    assert_eq!(result.microstates.len(), 2);
    assert!(result.microstates[0].matches("loading"));
    assert_eq!(result.snapshot.value(), &StateValue::from("success"));
    assert_eq!(result.snapshot.context()["ready"], json!(true));
    assert!(result.snapshot.is_done());
}

#[test]
fn guarded_fetch_returns_the_input_snapshot() {
    let machine = fetch_machine(false);
    let idle = machine.initial_snapshot(None).unwrap();

    let next = machine.transition(&idle, "FETCH", None).unwrap();

    assert!(Arc::ptr_eq(&idle, &next));
    assert_eq!(next.value(), &StateValue::from("idle"));

    let candidates = machine.transition_candidates(&idle, &Event::new("FETCH"));
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].guard().map(Guard::name), Some("hasPermission"));
}

#[test]
fn previous_snapshot_is_never_mutated() {
    let machine = fetch_machine(true);
    let idle = machine.initial_snapshot(None).unwrap();
    let before = (*idle).clone();

    machine.transition(&idle, "FETCH", None).unwrap();

    assert_eq!(*idle, before);
}

#[test]
fn same_input_gives_same_output() {
    let machine = fetch_machine(true);
    let idle = machine.initial_snapshot(None).unwrap();

    let first = machine.transition(&idle, "FETCH", None).unwrap();
    let second = machine.transition(&idle, "FETCH", None).unwrap();

    assert_eq!(first.value(), second.value());
    assert_eq!(first.context(), second.context());
    assert_eq!(first.actions(), second.actions());
}

#[test]
fn exits_run_innermost_first_and_entries_outermost_first() {
    let machine = MachineBuilder::new("doc")
        .context(Vec::<String>::new())
        .initial("a")
        .state(
            StateNodeBuilder::compound("a")
                .entry(log("enter a"))
                .exit(log("exit a"))
                .state(
                    StateNodeBuilder::atomic("a1")
                        .entry(log("enter a1"))
                        .exit(log("exit a1"))
                        .on("GO", TransitionBuilder::to("#doc.b.b2").action(log("go"))),
                ),
        )
        .state(
            StateNodeBuilder::compound("b")
                .entry(log("enter b"))
                .state(StateNodeBuilder::atomic("b1").entry(log("enter b1")))
                .state(StateNodeBuilder::atomic("b2").entry(log("enter b2"))),
        )
        .build()
        .unwrap();

    let start = machine.initial_snapshot(None).unwrap();
    assert_eq!(start.context(), &vec!["enter a", "enter a1"]);

    let next = machine.transition(&start, "GO", None).unwrap();

    assert_eq!(
        next.context()[2..],
        ["exit a1", "exit a", "go", "enter b", "enter b2"]
    );
    assert!(next.matches("b.b2"));
}

#[test]
fn shallow_history_restores_the_direct_child() {
    let machine = player(HistoryKind::Shallow);
    let start = machine.initial_snapshot(None).unwrap();

    let paused = machine.transition(&start, "PAUSE", None).unwrap();
    let off = machine.transition(&paused, "POWER", None).unwrap();
    assert!(off.matches("off"));
    assert_eq!(
        off.history_value().get("player.on"),
        Some(&["player.on.paused".to_string()][..])
    );

    let on = machine.transition(&off, "POWER", None).unwrap();
    assert!(on.matches("on.paused"));
}

#[test]
fn shallow_history_enters_nested_defaults() {
    let machine = player(HistoryKind::Shallow);
    let start = machine.initial_snapshot(None).unwrap();

    let second = machine.transition(&start, "NEXT", None).unwrap();
    let off = machine.transition(&second, "POWER", None).unwrap();
    let on = machine.transition(&off, "POWER", None).unwrap();

    assert!(on.matches("on.playing.track1"));
}

#[test]
fn deep_history_restores_the_leaf() {
    let machine = player(HistoryKind::Deep);
    let start = machine.initial_snapshot(None).unwrap();

    let second = machine.transition(&start, "NEXT", None).unwrap();
    let off = machine.transition(&second, "POWER", None).unwrap();
    let on = machine.transition(&off, "POWER", None).unwrap();

    assert!(on.matches("on.playing.track2"));
}

#[test]
fn history_without_record_uses_the_parent_initial() {
    let machine = player(HistoryKind::Shallow);
    let off = machine
        .resolve_state_value(&StateValue::from("off"))
        .unwrap();

    let on = machine.transition(&off, "POWER", None).unwrap();

    assert!(on.matches("on.playing.track1"));
}

#[test]
fn parallel_regions_complete_together() {
    let machine = MachineBuilder::new("upload")
        .context(json!(null))
        .initial("uploading")
        .state(
            StateNodeBuilder::parallel("uploading")
                .state(
                    StateNodeBuilder::compound("file")
                        .state(StateNodeBuilder::atomic("sending").on("FILE_SENT", TransitionBuilder::to("sent")))
                        .state(StateNodeBuilder::final_state("sent")),
                )
                .state(
                    StateNodeBuilder::compound("meta")
                        .state(StateNodeBuilder::atomic("pending").on("META_SAVED", TransitionBuilder::to("saved")))
                        .state(StateNodeBuilder::final_state("saved")),
                )
                .on("done.state.upload.uploading", TransitionBuilder::to("complete")),
        )
        .state(StateNodeBuilder::final_state("complete").output(json!({ "uploaded": true })))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(None).unwrap();
    assert!(start.matches("uploading.file.sending"));
    assert!(start.matches("uploading.meta.pending"));

    let half = machine.transition(&start, "FILE_SENT", None).unwrap();
    assert!(half.matches("uploading.file.sent"));
    assert!(!half.is_done());

    let result = machine.macrostep(&half, "META_SAVED", None).unwrap();
    assert_eq!(result.microstates.len(), 2);
    assert_eq!(result.snapshot.value(), &StateValue::from("complete"));
    assert_eq!(
        machine.status(&result.snapshot),
        Status::Done {
            output: Some(json!({ "uploaded": true }))
        }
    );
}

#[test]
fn events_handled_in_several_regions_fire_together() {
    let region = |key: &str| -> StateNodeBuilder<Value> {
        StateNodeBuilder::compound(key)
            .state(StateNodeBuilder::atomic("off").on("TOGGLE", TransitionBuilder::to("on")))
            .state(StateNodeBuilder::atomic("on").on("TOGGLE", TransitionBuilder::to("off")))
    };
    let machine = MachineBuilder::new("format")
        .context(json!(null))
        .parallel()
        .state(region("bold"))
        .state(region("italic"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(None).unwrap();
    let result = machine.macrostep(&start, "TOGGLE", None).unwrap();

    assert_eq!(result.microstates.len(), 1);
    assert!(result.snapshot.matches("bold.on"));
    assert!(result.snapshot.matches("italic.on"));
    assert_eq!(result.snapshot.to_paths(), vec!["bold", "bold.on", "italic", "italic.on"]);
}

#[test]
fn endless_eventless_loop_is_bounded() {
    let machine = MachineBuilder::new("loop")
        .context(json!(null))
        .config(MachineConfig::default().with_max_microsteps(10))
        .initial("start")
        .state(StateNodeBuilder::atomic("start").on("GO", TransitionBuilder::to("a")))
        .state(StateNodeBuilder::atomic("a").always(TransitionBuilder::to("b")))
        .state(StateNodeBuilder::atomic("b").always(TransitionBuilder::to("a")))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(None).unwrap();
    let err = machine.transition(&start, "GO", None).unwrap_err();

    assert!(matches!(err, StatechartError::MaxStepsExceeded { limit: 10 }));
}

#[test]
fn unhandled_error_event_surfaces_its_payload() {
    let machine = fetch_machine(true);
    let idle = machine.initial_snapshot(None).unwrap();

    let err = machine
        .transition(&idle, Event::error("network", json!({ "status": 503 })), None)
        .unwrap_err();

    match err {
        StatechartError::UnhandledErrorEvent { event, data } => {
            assert_eq!(event, "error.network");
            assert_eq!(data["status"], 503);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn handled_error_event_transitions() {
    let machine = MachineBuilder::new("job")
        .context(json!(null))
        .initial("running")
        .state(StateNodeBuilder::atomic("running").on("error.crash", TransitionBuilder::to("failed")))
        .state(StateNodeBuilder::final_state("failed"))
        .build()
        .unwrap();

    let running = machine.initial_snapshot(None).unwrap();
    let failed = machine
        .transition(&running, Event::error("crash", json!("boom")), None)
        .unwrap();

    assert!(failed.matches("failed"));
    assert_eq!(failed.event().data, json!("boom"));
}

#[test]
fn actors_start_with_their_state_and_stop_on_exit() {
    let machine = MachineBuilder::new("chat")
        .context_factory(|spawner: &mut Spawner, _: &Value| {
            let logger = spawner.spawn("logger", json!(null));
            json!({ "logger": logger.id() })
        })
        .initial("connected")
        .state(
            StateNodeBuilder::atomic("connected")
                .entry(Action::spawn_with_id("socket", "ws", json!({ "url": "wss://chat" })))
                .on("DISCONNECT", TransitionBuilder::to("offline")),
        )
        .state(StateNodeBuilder::atomic("offline"))
        .build()
        .unwrap();

    let connected = machine.initial_snapshot(None).unwrap();
    assert_eq!(connected.context()["logger"], json!("logger:0"));
    assert_eq!(
        connected.actions().iter().map(Effect::kind).collect::<Vec<_>>(),
        vec!["start_actor", "start_actor"]
    );
    assert_eq!(
        connected.child("socket").and_then(|actor| actor.owner()),
        Some("chat.connected")
    );

    let offline = machine.transition(&connected, "DISCONNECT", None).unwrap();
    assert_eq!(
        offline.actions(),
        &[Effect::StopActor {
            id: "socket".to_string()
        }]
    );
    assert!(offline.child("socket").is_none());
    assert!(offline.child("logger:0").is_some());
}

#[test]
fn factory_actors_lead_the_trace_from_a_bare_value() {
    let machine = MachineBuilder::new("clock")
        .context_factory(|spawner: &mut Spawner, _: &Value| {
            let timer = spawner.spawn("timer", json!(null));
            json!({ "timer": timer.id() })
        })
        .initial("a")
        .state(StateNodeBuilder::atomic("a").on("GO", TransitionBuilder::to("b")))
        .state(StateNodeBuilder::atomic("b"))
        .build()
        .unwrap();

    let step = machine.macrostep(StateValue::from("a"), "GO", None).unwrap();
    fn kinds(actions: &[Effect]) -> Vec<&str> {
        actions.iter().map(Effect::kind).collect()
    }

    assert!(step.snapshot.matches("b"));
    assert!(step.snapshot.child("timer:0").is_some());
    assert_eq!(kinds(step.snapshot.actions()), vec!["start_actor"]);
    assert!(matches!(
        &step.snapshot.actions()[0],
        Effect::StartActor { actor } if actor.id() == "timer:0"
    ));
    assert_eq!(kinds(step.microstates[0].actions()), vec!["start_actor"]);

    // An unknown event from a bare value starts nothing.
    let idle = machine.transition(StateValue::from("a"), "UNKNOWN", None).unwrap();
    assert!(idle.matches("a"));

    // Continuing from a snapshot does not start the factory actors again.
    let start = machine.initial_snapshot(None).unwrap();
    let moved = machine.transition(&start, "GO", None).unwrap();
    assert!(moved.actions().is_empty());
    assert!(moved.child("timer:0").is_some());
}

#[test]
fn snapshot_paths_follow_the_machine_delimiter() {
    let machine = MachineBuilder::new("media")
        .config(MachineConfig {
            delimiter: "/".to_string(),
            ..MachineConfig::default()
        })
        .context(json!({}))
        .initial("on")
        .state(
            StateNodeBuilder::compound("on")
                .initial("playing")
                .state(StateNodeBuilder::atomic("playing").on("PAUSE", TransitionBuilder::to("paused")))
                .state(StateNodeBuilder::atomic("paused")),
        )
        .build()
        .unwrap();

    let playing = machine.initial_snapshot(None).unwrap();
    assert_eq!(playing.delimiter(), "/");
    assert!(playing.matches("on/playing"));
    assert!(!playing.matches("on.playing"));
    assert_eq!(playing.to_paths(), vec!["on", "on/playing"]);

    let paused = machine.transition(&playing, "PAUSE", None).unwrap();
    assert!(paused.matches("on/paused"));
    assert_eq!(paused.to_paths(), vec!["on", "on/paused"]);
}

#[test]
fn checkpoint_restores_value_history_and_children() {
    let machine = player(HistoryKind::Deep);
    let start = machine.initial_snapshot(None).unwrap();
    let second = machine.transition(&start, "NEXT", None).unwrap();
    let off = machine.transition(&second, "POWER", None).unwrap();

    let json = machine.checkpoint(&off).to_json().unwrap();
    let checkpoint = Checkpoint::<Value>::from_json(&json).unwrap();
    let restored = machine.restore_state(&checkpoint, None).unwrap();

    assert_eq!(restored.value(), off.value());
    assert_eq!(restored.history_value(), off.history_value());

    let on = machine.transition(&restored, "POWER", None).unwrap();
    assert!(on.matches("on.playing.track2"));
}

#[test]
fn checkpoint_of_another_machine_is_rejected() {
    let fetch = fetch_machine(true);
    let idle = fetch.initial_snapshot(None).unwrap();
    let checkpoint = fetch.checkpoint(&idle);

    let err = player(HistoryKind::Shallow)
        .restore_state(&checkpoint, None)
        .unwrap_err();

    assert!(matches!(err, StatechartError::Checkpoint(_)));
}

#[test]
fn bare_values_are_resolved_before_transitioning() {
    let machine = player(HistoryKind::Shallow);

    let next = machine
        .transition(StateValue::branch("on", "paused"), "PLAY", None)
        .unwrap();
    assert!(next.matches("on.playing.track1"));

    let err = machine
        .resolve_state_value(&StateValue::from("nowhere"))
        .unwrap_err();
    assert!(matches!(err, StatechartError::InvalidStateValue { .. }));
}

#[test]
fn queries_describe_the_active_configuration() {
    let machine = player(HistoryKind::Shallow);
    let start = machine.initial_snapshot(None).unwrap();

    assert!(machine.is_in(&start, "player.on.playing"));
    assert!(machine.is_in(&start, "#player.on.playing.track1"));
    assert!(!machine.is_in(&start, "player.off"));
    assert_eq!(machine.next_events(&start), vec!["NEXT", "PAUSE", "POWER"]);
    assert!(machine.lookup_node_by_id("player.nowhere").is_err());
}
