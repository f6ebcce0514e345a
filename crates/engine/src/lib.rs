// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! preflight-engine: the Step Graph & Executor (C1) and Reconciliation
//! Cycle (C2).

pub mod compiler;
pub mod cycle;
pub mod error;
pub mod executor;

pub use compiler::{compile, StepGraph, StepNode};
pub use cycle::{Cycle, DEFAULT_RECONCILE_TIMEOUT};
pub use error::CompileError;
pub use executor::{
    run_apply, run_check_and_plan, AppliedEntry, ApplyPhaseOutput, BlockedEntry, ExecutorConfig,
    PlanEntry, PlanPhaseOutput, SkippedEntry,
};
