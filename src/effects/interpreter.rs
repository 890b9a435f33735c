//! Interpreter that runs a machine and carries out its effects.

use crate::core::{ActorContext, Context, Effect as EffectDescriptor, Event, Snapshot};
use crate::effects::handler::{EffectError, EffectHandlers};
use crate::machine::StateMachine;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default bound on effect rounds per flush.
pub const DEFAULT_MAX_ROUNDS: usize = 100;

/// Owns a machine, its current snapshot and the effects still to run.
///
/// `send` is synchronous and only queues effects; `flush` runs them against
/// an environment and feeds the events they produce back into the machine.
pub struct Interpreter<C: Context, Env> {
    machine: StateMachine<C>,
    handlers: EffectHandlers<Env>,
    actor: ActorContext,
    snapshot: Arc<Snapshot<C>>,
    pending: VecDeque<EffectDescriptor>,
    max_rounds: usize,
}

impl<C: Context, Env: Clone + Send + Sync + 'static> Interpreter<C, Env> {
    /// Start `machine`, queueing the effects of its initial snapshot.
    pub fn new(
        machine: StateMachine<C>,
        handlers: EffectHandlers<Env>,
        actor: Option<ActorContext>,
    ) -> Result<Self, EffectError> {
        let actor = actor.unwrap_or_default();
        let snapshot = machine.initial_snapshot(Some(&actor))?;
        let pending = snapshot.actions().iter().cloned().collect();

        tracing::debug!(
            machine = machine.id(),
            session = %actor.session_id,
            "interpreter started"
        );

        Ok(Self {
            machine,
            handlers,
            actor,
            snapshot,
            pending,
            max_rounds: DEFAULT_MAX_ROUNDS,
        })
    }

    /// Set the bound on effect rounds per flush.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn machine(&self) -> &StateMachine<C> {
        &self.machine
    }

    /// Current snapshot (pure)
    pub fn snapshot(&self) -> &Arc<Snapshot<C>> {
        &self.snapshot
    }

    /// Effects queued and not yet run.
    pub fn pending(&self) -> impl Iterator<Item = &EffectDescriptor> {
        self.pending.iter()
    }

    /// Process one event and queue the effects it produced.
    pub fn send(&mut self, event: impl Into<Event>) -> Result<&Arc<Snapshot<C>>, EffectError> {
        let next = self
            .machine
            .transition(&self.snapshot, event, Some(&self.actor))?;

        if !Arc::ptr_eq(&next, &self.snapshot) {
            self.pending.extend(next.actions().iter().cloned());
            self.snapshot = next;
        }
        Ok(&self.snapshot)
    }

    /// Run queued effects until none remain.
    ///
    /// Each round takes every queued effect in order; events a handler
    /// returns are sent before the next effect runs. Returns the number of
    /// rounds taken.
    ///
    /// # Errors
    ///
    /// The first handler or transition failure, or `DidNotSettle` when
    /// effects are still queued after the round limit.
    pub async fn flush(&mut self, env: &Env) -> Result<usize, EffectError> {
        let mut rounds = 0;

        while !self.pending.is_empty() {
            if rounds == self.max_rounds {
                tracing::warn!(rounds, pending = self.pending.len(), "effects did not settle");
                return Err(EffectError::DidNotSettle { rounds });
            }
            rounds += 1;

            let batch: Vec<EffectDescriptor> = self.pending.drain(..).collect();
            for effect in batch {
                tracing::trace!(kind = effect.kind(), round = rounds, "running effect");
                let events = self.handlers.run(&effect, env).await?;
                for event in events {
                    self.send(event)?;
                }
            }
        }

        Ok(rounds)
    }
}
