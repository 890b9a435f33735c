//! The macrostep driver.

use super::select::{select, Probe};
use super::step::{microstep, Step};
use crate::core::{Context, Effect, Event, Snapshot};
use crate::definition::StateTree;
use crate::error::StatechartError;
use std::collections::VecDeque;
use std::sync::Arc;

/// Result of processing one external event.
#[derive(Debug, Clone)]
pub struct Macrostep<C: Context> {
    /// The settled snapshot. Its `actions` hold every effect of the
    /// macrostep in step order.
    pub snapshot: Arc<Snapshot<C>>,
    /// Every intermediate snapshot, each with only its own step's effects.
    pub microstates: Vec<Arc<Snapshot<C>>>,
}

impl<C: Context> Macrostep<C> {
    fn unchanged(snapshot: &Arc<Snapshot<C>>) -> Self {
        Self {
            snapshot: Arc::clone(snapshot),
            microstates: Vec::new(),
        }
    }

    /// Whether the event caused no microstep.
    pub fn is_unchanged(&self) -> bool {
        self.microstates.is_empty()
    }

    /// Put `leading` in front of the first microstate's effects and of the
    /// settled snapshot's effects.
    pub(crate) fn with_leading_actions(self, leading: &[Effect]) -> Self {
        let prepend = |state: &Arc<Snapshot<C>>| {
            let actions = leading.iter().chain(state.actions.iter()).cloned().collect();
            Arc::new(state.with_actions(actions))
        };
        let snapshot = prepend(&self.snapshot);
        let mut microstates = self.microstates;
        if let Some(first) = microstates.first_mut() {
            let updated = prepend(&*first);
            *first = updated;
        }
        Self {
            snapshot,
            microstates,
        }
    }
}

/// Process `event` and drain to a stable configuration.
///
/// When the event enables no transition (or the machine is already done)
/// the input snapshot is returned as is, and `Arc::ptr_eq` holds between
/// input and result.
///
/// # Errors
///
/// `MaxStepsExceeded` when more than `limit` microsteps run, plus any
/// guard or action failure. No partial result is returned.
pub fn macrostep<C: Context>(
    tree: &StateTree<C>,
    snapshot: &Arc<Snapshot<C>>,
    event: &Event,
    limit: usize,
) -> Result<Macrostep<C>, StatechartError> {
    if snapshot.done {
        tracing::warn!(event = %event.name, "ignoring event sent to a finished machine");
        return Ok(Macrostep::unchanged(snapshot));
    }

    let transitions = select(tree, &snapshot.configuration, &snapshot.context, event, Probe::Event)?;
    if transitions.is_empty() {
        tracing::debug!(event = %event.name, "no enabled transition");
        return Ok(Macrostep::unchanged(snapshot));
    }

    if limit == 0 {
        return Err(StatechartError::MaxStepsExceeded { limit });
    }
    let first = microstep(tree, snapshot, &transitions, event)?;
    drive(tree, first, limit)
}

/// Drain eventless transitions and raised events after a first step.
///
/// Eventless transitions are probed before the internal queue; their guards
/// see the event of the latest step. The first step counts toward `limit`.
pub(crate) fn drive<C: Context>(
    tree: &StateTree<C>,
    first: Step<C>,
    limit: usize,
) -> Result<Macrostep<C>, StatechartError> {
    let mut queue: VecDeque<Event> = first.raised.into();
    let mut current = Arc::new(first.snapshot);
    let mut microstates = vec![Arc::clone(&current)];
    let mut steps = 1;

    while !current.done {
        let eventless = select(
            tree,
            &current.configuration,
            &current.context,
            &current.event,
            Probe::Eventless,
        )?;

        let (transitions, event) = if !eventless.is_empty() {
            (eventless, current.event.clone())
        } else if let Some(internal) = queue.pop_front() {
            let selected = select(
                tree,
                &current.configuration,
                &current.context,
                &internal,
                Probe::Event,
            )?;
            (selected, internal)
        } else {
            break;
        };

        if transitions.is_empty() {
            tracing::trace!(event = %event.name, "internal event dropped");
            continue;
        }

        steps += 1;
        if steps > limit {
            return Err(StatechartError::MaxStepsExceeded { limit });
        }

        let step = microstep(tree, &current, &transitions, &event)?;
        queue.extend(step.raised);
        current = Arc::new(step.snapshot);
        microstates.push(Arc::clone(&current));
    }

    let snapshot = if microstates.len() == 1 {
        Arc::clone(&current)
    } else {
        let actions = microstates
            .iter()
            .flat_map(|state| state.actions.iter().cloned())
            .collect();
        Arc::new(current.with_actions(actions))
    };

    tracing::debug!(
        microsteps = microstates.len(),
        value = %snapshot.value,
        "macrostep settled"
    );

    Ok(Macrostep {
        snapshot,
        microstates,
    })
}
