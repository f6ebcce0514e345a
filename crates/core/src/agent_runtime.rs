// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! AgentContext / Runtime: the thread-safe aggregator of agent lifetime
//! counters, and the state-machine states it reports alongside them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::result::ReconciliationResult;
use crate::schedule::Schedule;

/// Agent lifecycle state. Mirrors the C3 state machine table verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Stopped,
    Starting,
    Running,
    Reconciling,
    Stopping,
    Error,
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState::Stopped
    }
}

/// Aggregate health, derived from the error taxonomy: `degraded` on any
/// recoverable error, `unhealthy` on any non-recoverable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Healthy
    }
}

/// Snapshot of the agent's lifetime counters plus current state, for
/// `status_response`. Immutable once returned — a point-in-time copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub state: AgentState,
    pub health: HealthStatus,
    pub start_at_ms: u64,
    pub last_reconcile_at_ms: Option<u64>,
    pub reconcile_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub uptime: Duration,
    pub next_reconcile_at_ms: Option<u64>,
}

#[derive(Default)]
struct Counters {
    state: AgentState,
    health: HealthStatus,
    start_at_ms: u64,
    last_reconcile_at_ms: Option<u64>,
    reconcile_count: u64,
    error_count: u64,
    last_error: Option<String>,
    next_reconcile_at_ms: Option<u64>,
}

/// Thread-safe aggregator of an agent's lifetime counters.
///
/// Status reads take a read lock; state transitions and counter updates
/// take the write lock, per the shared-resource policy in §5.
pub struct AgentRuntime {
    counters: RwLock<Counters>,
    started: Instant,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(Counters::default()),
            started: Instant::now(),
        }
    }

    pub fn record_start(&self, start_at_ms: u64) {
        let mut c = self.counters.write();
        c.start_at_ms = start_at_ms;
        c.state = AgentState::Running;
    }

    pub fn set_state(&self, state: AgentState) {
        self.counters.write().state = state;
    }

    pub fn state(&self) -> AgentState {
        self.counters.read().state
    }

    /// Record the outcome of a reconciliation cycle: bumps `reconcileCount`
    /// always, bumps `errorCount` and updates health when the result carries
    /// errors.
    pub fn record_result(&self, result: &ReconciliationResult, now_ms: u64) {
        let mut c = self.counters.write();
        c.reconcile_count += 1;
        c.last_reconcile_at_ms = Some(now_ms);

        if let Some(worst) = result.errors.iter().max_by_key(|e| !e.recoverable) {
            c.error_count += result.errors.len() as u64;
            c.last_error = Some(worst.message.clone());
            c.health = if worst.recoverable {
                HealthStatus::Degraded
            } else {
                HealthStatus::Unhealthy
            };
        }
    }

    pub fn record_error(&self, message: impl Into<String>, recoverable: bool) {
        let mut c = self.counters.write();
        c.error_count += 1;
        c.last_error = Some(message.into());
        c.health = if recoverable {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };
    }

    pub fn set_next_reconcile_at(&self, at_ms: Option<u64>) {
        self.counters.write().next_reconcile_at_ms = at_ms;
    }

    pub fn snapshot(&self) -> AgentStatus {
        let c = self.counters.read();
        AgentStatus {
            state: c.state,
            health: c.health,
            start_at_ms: c.start_at_ms,
            last_reconcile_at_ms: c.last_reconcile_at_ms,
            reconcile_count: c.reconcile_count,
            error_count: c.error_count,
            last_error: c.last_error.clone(),
            uptime: self.started.elapsed(),
            next_reconcile_at_ms: c.next_reconcile_at_ms,
        }
    }
}

/// Compute the next reconcile time for a schedule, given the last
/// reconcile's epoch-ms completion time (or the agent's start time if it
/// has not yet reconciled).
pub fn next_reconcile_at(schedule: &Schedule, last_or_start_ms: u64) -> Option<u64> {
    schedule.next_fire_after(last_or_start_ms).ok()
}
