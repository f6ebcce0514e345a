// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Error types for the reconciliation engine (C1/C2).

use preflight_core::StepId;
use thiserror::Error;

/// Errors that can occur while compiling providers into a step graph.
/// Any of these is fatal to the current cycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("provider {provider} failed to compile: {cause}")]
    ProviderFailed { provider: String, cause: String },

    #[error("duplicate step id {0}")]
    DuplicateStepId(StepId),

    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: StepId, dependency: StepId },

    #[error("step dependency graph contains a cycle reachable from {0}")]
    Cyclic(StepId),
}
