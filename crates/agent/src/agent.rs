// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Agent: wires the state machine and scheduler loop to one [`Cycle`],
//! exposing `start`/`stop`/`recover` as the in-process lifecycle API (C4
//! wraps the same three operations over the wire).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use preflight_core::{AgentRuntime, AgentState, AgentStatus, Clock, CompileContext, Schedule};
use preflight_engine::Cycle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::AgentError;
use crate::machine::{self, Event};
use crate::scheduler::{self, SchedulerCtx};

/// Settling delay between `START` and `STARTED`, per the C3 startup
/// sequence. Arbitrary but load-bearing for test determinism.
pub const STARTED_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How long `stop()` waits for the scheduler task to exit before forcing
/// `stopped` regardless.
pub const STOPPING_TIMEOUT: Duration = Duration::from_millis(100);

/// One reconciling agent: a state machine, a schedule, and the cycle it
/// fires on that schedule.
pub struct Agent {
    runtime: Arc<AgentRuntime>,
    cycle: Arc<Cycle>,
    compile_ctx: Arc<dyn CompileContext>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    stop_notify: Arc<Notify>,
    scheduler_handle: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Agent {
    pub fn new(
        cycle: Arc<Cycle>,
        compile_ctx: Arc<dyn CompileContext>,
        schedule: Schedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            runtime: Arc::new(AgentRuntime::new()),
            cycle,
            compile_ctx,
            schedule,
            clock,
            stop_notify: Arc::new(Notify::new()),
            scheduler_handle: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Lifetime counters and current state, for status queries.
    pub fn runtime(&self) -> &Arc<AgentRuntime> {
        &self.runtime
    }

    pub fn status(&self) -> AgentStatus {
        self.runtime.snapshot()
    }

    pub fn state(&self) -> AgentState {
        self.runtime.state()
    }

    /// `START` → (settle) → `STARTED`, then spawn the scheduler task.
    /// Starting an already-running agent, or one that was stopped once
    /// already, is an error — this agent is single-use past its first stop.
    pub async fn start(&self) -> Result<(), AgentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AgentError::AlreadyClosed);
        }
        if self.runtime.state() != AgentState::Stopped {
            return Err(AgentError::AlreadyStarted);
        }

        machine::apply(&self.runtime, self.clock.as_ref(), Event::Start);
        tokio::time::sleep(STARTED_SETTLE_DELAY).await;
        machine::apply(&self.runtime, self.clock.as_ref(), Event::Started);

        let ctx = Arc::new(SchedulerCtx {
            runtime: Arc::clone(&self.runtime),
            cycle: Arc::clone(&self.cycle),
            compile_ctx: Arc::clone(&self.compile_ctx),
            clock: Arc::clone(&self.clock),
        });
        let schedule = self.schedule.clone();
        let stop_notify = Arc::clone(&self.stop_notify);
        let handle = tokio::spawn(scheduler::run(ctx, schedule, stop_notify));
        *self.scheduler_handle.lock() = Some(handle);

        Ok(())
    }

    /// `STOP`, close the stop channel, wait up to [`STOPPING_TIMEOUT`] for
    /// the scheduler task to exit, then force `stopped`. A no-op if already
    /// stopped.
    pub async fn stop(&self) {
        if self.runtime.state() == AgentState::Stopped {
            return;
        }

        machine::apply(&self.runtime, self.clock.as_ref(), Event::Stop);
        self.stop_notify.notify_waiters();

        let handle = self.scheduler_handle.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(STOPPING_TIMEOUT, handle).await.is_err() {
                tracing::warn!("scheduler task did not exit within the stopping timeout");
            }
        }

        self.runtime.set_state(AgentState::Stopped);
        self.closed.store(true, Ordering::SeqCst);
    }

    /// `RECOVER`: leave `error` and resume ticking. A no-op in any other
    /// state.
    pub fn recover(&self) {
        machine::apply(&self.runtime, self.clock.as_ref(), Event::Recover);
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
