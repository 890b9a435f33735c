//! Property-based tests for the interpreter.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated event sequences and state values.

use harel::builder::{MachineBuilder, StateNodeBuilder, TransitionBuilder};
use harel::core::{Action, Event, HistoryKind, StateValue};
use harel::StateMachine;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn player() -> StateMachine<Value> {
    MachineBuilder::new("player")
        .context(json!({ "presses": 0 }))
        .initial("on")
        .state(
            StateNodeBuilder::compound("on")
                .state(
                    StateNodeBuilder::compound("playing")
                        .state(StateNodeBuilder::atomic("track1").on("NEXT", TransitionBuilder::to("track2")))
                        .state(StateNodeBuilder::atomic("track2").on("NEXT", TransitionBuilder::to("track1")))
                        .on("PAUSE", TransitionBuilder::to("paused")),
                )
                .state(StateNodeBuilder::atomic("paused").on("PLAY", TransitionBuilder::to("playing")))
                .state(StateNodeBuilder::history("hist", HistoryKind::Deep))
                .on(
                    "POWER",
                    TransitionBuilder::to("off").action(Action::assign(|ctx: &Value, _: &Event| {
                        json!({ "presses": ctx["presses"].as_u64().unwrap_or(0) + 1 })
                    })),
                ),
        )
        .state(StateNodeBuilder::atomic("off").on("POWER", TransitionBuilder::to("on.hist")))
        .build()
        .unwrap()
}

prop_compose! {
    fn arbitrary_event()(variant in 0..5u8) -> &'static str {
        match variant {
            0 => "NEXT",
            1 => "PAUSE",
            2 => "PLAY",
            3 => "POWER",
            _ => "UNKNOWN",
        }
    }
}

prop_compose! {
    fn arbitrary_value()(variant in 0..4u8) -> StateValue {
        match variant {
            0 => StateValue::from("off"),
            1 => StateValue::from_path("on.paused", "."),
            2 => StateValue::from_path("on.playing.track1", "."),
            _ => StateValue::from_path("on.playing.track2", "."),
        }
    }
}

proptest! {
    #[test]
    fn resolving_a_resolved_value_changes_nothing(value in arbitrary_value()) {
        let machine = player();
        let resolved = machine.resolve_state_value(&value).unwrap();
        let again = machine.resolve_state(&resolved).unwrap();

        prop_assert_eq!(resolved.value(), &value);
        prop_assert_eq!(again.value(), resolved.value());
        prop_assert_eq!(again.configuration(), resolved.configuration());
    }

    #[test]
    fn event_sequences_are_deterministic(events in prop::collection::vec(arbitrary_event(), 0..20)) {
        let machine = player();
        let run = || {
            events.iter().try_fold(machine.initial_snapshot(None)?, |snapshot, event| {
                machine.transition(&snapshot, *event, None)
            })
        };

        let first = run().unwrap();
        let second = run().unwrap();
        prop_assert_eq!(first.value(), second.value());
        prop_assert_eq!(first.context(), second.context());
        prop_assert_eq!(first.history_value(), second.history_value());
    }

    #[test]
    fn value_and_configuration_stay_consistent(events in prop::collection::vec(arbitrary_event(), 1..20)) {
        let machine = player();
        let mut snapshot = machine.initial_snapshot(None).unwrap();

        for event in events {
            snapshot = machine.transition(&snapshot, event, None).unwrap();
            let resolved = machine.resolve_state(&snapshot).unwrap();
            prop_assert_eq!(resolved.configuration(), snapshot.configuration());
        }
    }

    #[test]
    fn unknown_events_return_the_same_snapshot(value in arbitrary_value()) {
        let machine = player();
        let snapshot = machine.resolve_state_value(&value).unwrap();
        let next = machine.transition(&snapshot, "UNKNOWN", None).unwrap();

        prop_assert!(Arc::ptr_eq(&snapshot, &next));
    }

    #[test]
    fn each_event_takes_one_microstep(events in prop::collection::vec(arbitrary_event(), 1..20)) {
        let machine = player();
        let mut snapshot = machine.initial_snapshot(None).unwrap();

        for event in events {
            let result = machine.macrostep(&snapshot, event, None).unwrap();
            prop_assert!(result.microstates.len() <= 1);
            prop_assert_eq!(result.is_unchanged(), Arc::ptr_eq(&snapshot, &result.snapshot));
            snapshot = result.snapshot;
        }
    }

    #[test]
    fn power_presses_are_counted(presses in 0..10usize) {
        let machine = player();
        let mut snapshot = machine.initial_snapshot(None).unwrap();

        for _ in 0..presses {
            snapshot = machine.transition(&snapshot, "POWER", None).unwrap();
        }

        let exits = (presses + 1) / 2;
        prop_assert_eq!(snapshot.context()["presses"].as_u64(), Some(exits as u64));
        prop_assert_eq!(snapshot.matches("off"), presses % 2 == 1);
    }
}
