// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use preflight_core::ScheduleError;
use thiserror::Error;

/// Errors from the agent's start/stop lifecycle.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent is already running")]
    AlreadyStarted,
    #[error("agent was already stopped once and cannot be restarted")]
    AlreadyClosed,
    #[error("bad schedule: {0}")]
    Schedule(#[from] ScheduleError),
}
