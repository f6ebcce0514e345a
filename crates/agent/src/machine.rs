// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! The C3 state machine transition table, kept as a pure function so its
//! six states and seven events can be tested without touching a clock or a
//! scheduler task.

use preflight_core::{AgentRuntime, AgentState, Clock};

/// Events the machine responds to. `Error` and settling/timeout transitions
/// that aren't externally-dispatched events (the 100ms stopping timeout) are
/// driven by the agent and scheduler directly rather than through here.
#[derive(Debug, Clone)]
pub enum Event {
    Start,
    Started,
    Error(String),
    Tick,
    Stop,
    ReconcileComplete,
    Recover,
}

/// What an entry action into the new state must do, beyond recording the
/// state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    None,
    RecordStart,
    RecordError,
}

/// Look up the transition table. Unlisted (state, event) pairs leave the
/// state unchanged with no entry action, per "unlisted events are ignored in
/// that state".
pub fn transition(state: AgentState, event: &Event) -> (AgentState, EntryAction) {
    use AgentState::{Error, Reconciling, Running, Starting, Stopped, Stopping};
    use Event as E;

    match (state, event) {
        (Stopped, E::Start) => (Starting, EntryAction::None),
        (Starting, E::Started) => (Running, EntryAction::RecordStart),
        (Starting, E::Error(_)) => (Error, EntryAction::RecordError),
        (Running, E::Tick) => (Reconciling, EntryAction::None),
        (Running, E::Stop) => (Stopping, EntryAction::None),
        (Running, E::Error(_)) => (Error, EntryAction::RecordError),
        (Reconciling, E::ReconcileComplete) => (Running, EntryAction::None),
        (Reconciling, E::Stop) => (Stopping, EntryAction::None),
        (Reconciling, E::Error(_)) => (Error, EntryAction::RecordError),
        (Error, E::Recover) => (Running, EntryAction::None),
        (Error, E::Stop) => (Stopped, EntryAction::None),
        (current, _) => (current, EntryAction::None),
    }
}

/// Apply one event to `runtime`: compute the transition, run its entry
/// action against the runtime's counters, and record the resulting state.
/// Returns the state after the transition.
pub(crate) fn apply(runtime: &AgentRuntime, clock: &dyn Clock, event: Event) -> AgentState {
    let (next, action) = transition(runtime.state(), &event);
    match action {
        EntryAction::RecordStart => runtime.record_start(clock.epoch_ms()),
        EntryAction::RecordError => {
            let message = match &event {
                Event::Error(message) => message.clone(),
                _ => String::new(),
            };
            runtime.record_error(message, false);
        }
        EntryAction::None => {}
    }
    runtime.set_state(next);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        start = { AgentState::Stopped, Event::Start, AgentState::Starting, EntryAction::None },
        started = { AgentState::Starting, Event::Started, AgentState::Running, EntryAction::RecordStart },
        starting_error = { AgentState::Starting, Event::Error("boom".into()), AgentState::Error, EntryAction::RecordError },
        tick = { AgentState::Running, Event::Tick, AgentState::Reconciling, EntryAction::None },
        running_stop = { AgentState::Running, Event::Stop, AgentState::Stopping, EntryAction::None },
        running_error = { AgentState::Running, Event::Error("boom".into()), AgentState::Error, EntryAction::RecordError },
        reconcile_complete = { AgentState::Reconciling, Event::ReconcileComplete, AgentState::Running, EntryAction::None },
        reconciling_stop = { AgentState::Reconciling, Event::Stop, AgentState::Stopping, EntryAction::None },
        reconciling_error = { AgentState::Reconciling, Event::Error("boom".into()), AgentState::Error, EntryAction::RecordError },
        recover = { AgentState::Error, Event::Recover, AgentState::Running, EntryAction::None },
        error_stop = { AgentState::Error, Event::Stop, AgentState::Stopped, EntryAction::None },
    )]
    fn table_transitions(from: AgentState, event: Event, to: AgentState, action: EntryAction) {
        assert_eq!(transition(from, &event), (to, action));
    }

    #[parameterized(
        stopped_tick = { AgentState::Stopped, Event::Tick },
        running_start = { AgentState::Running, Event::Start },
        stopping_tick = { AgentState::Stopping, Event::Tick },
        error_tick = { AgentState::Error, Event::Tick },
    )]
    fn unlisted_events_are_ignored(state: AgentState, event: Event) {
        assert_eq!(transition(state, &event), (state, EntryAction::None));
    }
}
