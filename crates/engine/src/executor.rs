// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Execute (C1): Check → Plan → Apply over a compiled [`StepGraph`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use preflight_core::{Diff, RunContext, StepError, StepId, StepStatus};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::compiler::StepGraph;

/// Tunables for one executor pass. `concurrency` bounds Apply-phase
/// parallelism; `dry_run` skips Apply entirely and returns the plan
/// unchanged.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub concurrency: usize,
    pub dry_run: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            dry_run: false,
        }
    }
}

/// A step whose `Check` returned `NeedsApply`, with the diff `Plan`
/// produced for it.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub step_id: StepId,
    pub diff: Diff,
}

/// A step whose `Check` failed (`Unknown`), or one skipped because an
/// ancestor in its subtree failed Check.
#[derive(Debug, Clone)]
pub struct BlockedEntry {
    pub step_id: StepId,
    pub error: StepError,
}

/// Output of running Check then Plan over every step in topological order.
#[derive(Debug, Default)]
pub struct PlanPhaseOutput {
    pub statuses: HashMap<StepId, StepStatus>,
    pub plans: Vec<PlanEntry>,
    pub blocked: Vec<BlockedEntry>,
}

/// Run Check for every step in topological order; for each `NeedsApply`
/// step, run Plan. A step whose Check returns `Unknown` blocks its entire
/// dependent subtree — those steps are recorded blocked without being
/// checked themselves, since their upstream state is unresolved.
pub async fn run_check_and_plan(graph: &StepGraph, ctx: &RunContext) -> PlanPhaseOutput {
    let mut out = PlanPhaseOutput::default();
    let mut blocked_indices: HashSet<usize> = HashSet::new();

    for &idx in &graph.topo_order {
        let node = &graph.nodes[idx];

        if node.deps.iter().any(|d| blocked_indices.contains(d)) {
            blocked_indices.insert(idx);
            out.blocked.push(BlockedEntry {
                step_id: node.id.clone(),
                error: StepError::new(format!(
                    "skipped: a dependency of {} failed Check",
                    node.id
                )),
            });
            continue;
        }

        match node.step.check(ctx).await {
            Ok(StepStatus::Unknown) => {
                blocked_indices.insert(idx);
                out.statuses.insert(node.id.clone(), StepStatus::Unknown);
                out.blocked.push(BlockedEntry {
                    step_id: node.id.clone(),
                    error: StepError::new("check returned unknown status"),
                });
            }
            Ok(status) => {
                out.statuses.insert(node.id.clone(), status);
                if status == StepStatus::NeedsApply {
                    match node.step.plan(ctx).await {
                        Ok(diff) => out.plans.push(PlanEntry {
                            step_id: node.id.clone(),
                            diff,
                        }),
                        Err(error) => {
                            blocked_indices.insert(idx);
                            out.blocked.push(BlockedEntry {
                                step_id: node.id.clone(),
                                error,
                            });
                        }
                    }
                }
            }
            Err(error) => {
                blocked_indices.insert(idx);
                out.statuses.insert(node.id.clone(), StepStatus::Unknown);
                out.blocked.push(BlockedEntry {
                    step_id: node.id.clone(),
                    error,
                });
            }
        }
    }

    out
}

/// Outcome of attempting to apply one step.
#[derive(Debug)]
pub struct AppliedEntry {
    pub step_id: StepId,
    pub result: Result<(), StepError>,
    /// Set when the step's `apply` panicked rather than returning `Err`.
    /// Per the error taxonomy this is non-recoverable, unlike an ordinary
    /// apply error.
    pub panicked: bool,
}

/// A step skipped during Apply because a dependency failed (or was itself
/// skipped).
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    pub step_id: StepId,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ApplyPhaseOutput {
    pub applied: Vec<AppliedEntry>,
    pub skipped: Vec<SkippedEntry>,
}

/// Apply every step named in `eligible` (a subset of the steps whose Check
/// returned `NeedsApply`), honoring the DAG: a step runs only once every
/// dependency is `Satisfied` or has just applied successfully this cycle.
/// Independent steps within a wavefront run concurrently, bounded by
/// `config.concurrency`. A failed step's entire dependent subtree is
/// recorded skipped rather than attempted.
///
/// The semaphore is never closed while this function holds permits against
/// it, and `join_set` tasks are never aborted, so the `expect`s on those
/// joins below never fire.
#[allow(clippy::expect_used)]
pub async fn run_apply(
    graph: &StepGraph,
    statuses: &HashMap<StepId, StepStatus>,
    eligible: &HashSet<StepId>,
    config: &ExecutorConfig,
    ctx: &RunContext,
) -> ApplyPhaseOutput {
    let mut out = ApplyPhaseOutput::default();
    if config.dry_run {
        return out;
    }

    let mut resolved: HashSet<usize> = HashSet::new();
    let mut failed: HashSet<usize> = HashSet::new();
    for (idx, node) in graph.nodes.iter().enumerate() {
        if statuses.get(&node.id) == Some(&StepStatus::Satisfied) {
            resolved.insert(idx);
        }
    }

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));

    for layer_indices in group_by_layer(graph) {
        let mut to_run = Vec::new();
        for idx in layer_indices {
            let node = &graph.nodes[idx];
            if resolved.contains(&idx) || failed.contains(&idx) {
                continue;
            }
            let blocked_by_dep = node.deps.iter().any(|d| failed.contains(d));
            if blocked_by_dep {
                failed.insert(idx);
                out.skipped.push(SkippedEntry {
                    step_id: node.id.clone(),
                    reason: format!("a dependency of {} failed Apply", node.id),
                });
                continue;
            }
            if !eligible.contains(&node.id) {
                // NeedsApply but not applied this cycle (needs_approval or
                // notify_only): neither Satisfied nor just-applied, so it
                // blocks its dependents the same way a failed apply does.
                failed.insert(idx);
                continue;
            }
            to_run.push(idx);
        }

        let mut join_set = JoinSet::new();
        for idx in to_run {
            let node = &graph.nodes[idx];
            let step = Arc::clone(&node.step);
            let id = node.id.clone();
            let semaphore = Arc::clone(&semaphore);
            let ctx = *ctx;
            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                let (result, panicked) = apply_catching_panic(step, ctx).await;
                (idx, id, result, panicked)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (idx, id, result, panicked) = joined.expect("apply wavefront task was cancelled");
            match result {
                Ok(()) => {
                    resolved.insert(idx);
                    out.applied.push(AppliedEntry {
                        step_id: id,
                        result: Ok(()),
                        panicked,
                    });
                }
                Err(error) => {
                    failed.insert(idx);
                    out.applied.push(AppliedEntry {
                        step_id: id,
                        result: Err(error),
                        panicked,
                    });
                }
            }
        }
    }

    out
}

/// Group node indices by their compile-time layer, in layer order.
fn group_by_layer(graph: &StepGraph) -> Vec<Vec<usize>> {
    let max_layer = graph.nodes.iter().map(|n| n.layer).max().unwrap_or(0);
    let mut layers = vec![Vec::new(); max_layer + 1];
    for &idx in &graph.topo_order {
        layers[graph.nodes[idx].layer].push(idx);
    }
    layers
}

/// Run one step's `Apply`, catching a panic and converting it to a
/// non-recoverable [`StepError`] rather than letting it take down the
/// whole wavefront's `JoinSet`.
async fn apply_catching_panic(
    step: Arc<dyn preflight_core::Step>,
    ctx: RunContext,
) -> (Result<(), StepError>, bool) {
    use futures::FutureExt;
    use std::panic::AssertUnwindSafe;

    match AssertUnwindSafe(step.apply(&ctx)).catch_unwind().await {
        Ok(result) => (result, false),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "step apply panicked".to_string());
            (Err(StepError::new(message)), true)
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
