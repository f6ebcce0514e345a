// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! The scheduler loop: fires `TICK` on `Schedule`'s cadence while `running`,
//! dispatches the reconcile handler, and folds its outcome back into the
//! state machine.

use std::sync::Arc;
use std::time::Duration;

use preflight_core::{AgentRuntime, AgentState, Clock, CompileContext, Schedule};
use preflight_engine::Cycle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::machine::{self, Event};

/// Delay before the scheduler's first tick computation, so a flurry of
/// `start`/`stop` calls in quick succession (e.g. test setup) doesn't race
/// the first reconcile against the `STARTED` settling delay. Arbitrary but
/// load-bearing for test determinism.
pub const SCHEDULER_WARMUP_DELAY: Duration = Duration::from_millis(200);

pub(crate) struct SchedulerCtx {
    pub runtime: Arc<AgentRuntime>,
    pub cycle: Arc<Cycle>,
    pub compile_ctx: Arc<dyn CompileContext>,
    pub clock: Arc<dyn Clock>,
}

/// Run the scheduler loop until `stop` is notified. Each iteration sleeps
/// until the schedule's next fire time, then — only if the machine is still
/// `running` — dispatches `TICK`, runs one reconciliation cycle, and folds
/// the result back as `RECONCILE_COMPLETE` or `ERROR`.
pub(crate) async fn run(ctx: Arc<SchedulerCtx>, schedule: Schedule, stop: Arc<Notify>) {
    tokio::select! {
        () = tokio::time::sleep(SCHEDULER_WARMUP_DELAY) => {}
        () = stop.notified() => return,
    }

    let mut next_fire_ms = ctx.clock.epoch_ms();
    loop {
        next_fire_ms = match schedule.next_fire_after(next_fire_ms) {
            Ok(ms) => ms,
            Err(e) => {
                warn!("schedule computation failed, stopping scheduler: {e}");
                machine::apply(&ctx.runtime, ctx.clock.as_ref(), Event::Error(e.to_string()));
                return;
            }
        };
        ctx.runtime.set_next_reconcile_at(Some(next_fire_ms));

        let now_ms = ctx.clock.epoch_ms();
        let delay = Duration::from_millis(next_fire_ms.saturating_sub(now_ms));
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = stop.notified() => return,
        }

        if ctx.runtime.state() != AgentState::Running {
            // No coalescing queue: a tick that lands outside `running` is
            // simply dropped.
            continue;
        }

        machine::apply(&ctx.runtime, ctx.clock.as_ref(), Event::Tick);

        let cancel = CancellationToken::new();
        let result = ctx.cycle.reconcile(ctx.compile_ctx.as_ref(), cancel).await;
        let completed_at_ms = ctx.clock.epoch_ms();
        ctx.runtime.record_result(&result, completed_at_ms);

        let fatal = result.errors.iter().find(|e| !e.recoverable);
        let next_event = match fatal {
            Some(e) => Event::Error(e.message.clone()),
            None => Event::ReconcileComplete,
        };
        info!(
            drift_items = result.drift_items.len(),
            remediations = result.remediation_items.len(),
            errors = result.errors.len(),
            "reconcile cycle complete"
        );
        machine::apply(&ctx.runtime, ctx.clock.as_ref(), next_event);
    }
}
