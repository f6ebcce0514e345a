// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Reconcile (C2): the single-entry-point Check → Plan → Classify → Apply →
//! Record orchestration over one compiled step graph.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use preflight_core::{
    ApprovalRequest, Clock, CompileContext, Diff, DriftItem, DriftItemId, DriftSeverity, IdGen,
    Phase, Provider, ReconciliationError, ReconciliationResult, RemediationItem, RunContext, StepId,
};
use preflight_policy::{classify, ApprovalStore, Classification, RemediationPolicy};
use tokio_util::sync::CancellationToken;

use crate::compiler::compile;
use crate::executor::{run_apply, run_check_and_plan, ExecutorConfig};

/// Default reconciliation timeout, per `TimeoutConfig.Reconciliation`.
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Everything one reconciliation cycle needs that outlives a single call:
/// the provider set, policy, approval store, and the engine's clock/id
/// generator.
pub struct Cycle {
    pub providers: Vec<Box<dyn Provider>>,
    pub policy: RemediationPolicy,
    pub approval_store: Arc<ApprovalStore>,
    pub clock: Arc<dyn Clock>,
    pub id_gen: Arc<dyn IdGen>,
    pub executor_config: ExecutorConfig,
    pub timeout: Duration,
}

impl Cycle {
    pub fn new(
        providers: Vec<Box<dyn Provider>>,
        policy: RemediationPolicy,
        approval_store: Arc<ApprovalStore>,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
    ) -> Self {
        Self {
            providers,
            policy,
            approval_store,
            clock,
            id_gen,
            executor_config: ExecutorConfig::default(),
            timeout: DEFAULT_RECONCILE_TIMEOUT,
        }
    }

    /// Run one cycle against `compile_ctx`, cancellable through `cancel`.
    /// The cycle's own deadline (`self.timeout`) cancels `cancel`'s token
    /// if it fires first, so both paths converge on the same "cancelled"
    /// bookkeeping and partial progress already recorded by `run` survives.
    pub async fn reconcile(
        &self,
        compile_ctx: &dyn CompileContext,
        cancel: CancellationToken,
    ) -> ReconciliationResult {
        let started_at_ms = self.clock.epoch_ms();
        let sleep = tokio::time::sleep(self.timeout);
        tokio::pin!(sleep);
        let run_fut = self.run(compile_ctx, started_at_ms, cancel.clone());
        tokio::pin!(run_fut);

        loop {
            tokio::select! {
                result = &mut run_fut => return result,
                () = &mut sleep, if !cancel.is_cancelled() => {
                    cancel.cancel();
                }
            }
        }
    }

    /// The two `expect`s below assert graph/drift bookkeeping invariants
    /// this function itself maintains: a planned step's id always indexes
    /// into the graph it was planned from, and every applied step was
    /// seeded from a drift item recorded earlier in this same run.
    #[allow(clippy::expect_used)]
    async fn run(
        &self,
        compile_ctx: &dyn CompileContext,
        started_at_ms: u64,
        cancel: CancellationToken,
    ) -> ReconciliationResult {
        let mut result = ReconciliationResult::started(started_at_ms);
        let run_ctx = RunContext;

        if cancel.is_cancelled() {
            return self.cancelled(result);
        }

        let graph = match compile(&self.providers, compile_ctx).await {
            Ok(graph) => graph,
            Err(e) => {
                result
                    .errors
                    .push(ReconciliationError::new(Phase::Compile, e.to_string(), false));
                result.complete(self.clock.epoch_ms());
                return result;
            }
        };

        if cancel.is_cancelled() {
            return self.cancelled(result);
        }

        let check_out = run_check_and_plan(&graph, &run_ctx).await;
        for blocked in &check_out.blocked {
            result.errors.push(
                ReconciliationError::new(Phase::Check, blocked.error.to_string(), true)
                    .for_step(blocked.step_id.to_string()),
            );
        }

        let mut drift_by_step = Vec::new();
        for plan in &check_out.plans {
            let idx = graph
                .index_of(&plan.step_id)
                .expect("planned step must exist in its own graph");
            let node = &graph.nodes[idx];
            let severity = node.step.severity().unwrap_or_else(|| DriftSeverity::default_for_diff(&plan.diff));
            let drift_id = DriftItemId::new(self.id_gen.next());
            let drift = DriftItem {
                id: drift_id.clone(),
                step_id: plan.step_id.clone(),
                diff: plan.diff.clone(),
                severity,
            };
            result.drift_items.push(drift);
            drift_by_step.push((plan.step_id.clone(), drift_id, node.step.is_reversible(), plan.diff.clone()));
        }

        if cancel.is_cancelled() {
            return self.cancelled(result);
        }

        let mut eligible: HashSet<StepId> = HashSet::new();
        for (step_id, drift_id, is_reversible, diff) in &drift_by_step {
            let classification = if self.approval_store.consume_approval(step_id) {
                Classification::AutoApply
            } else {
                classify(self.policy, *is_reversible)
            };

            match classification {
                Classification::NotifyOnly => {}
                Classification::AutoApply | Classification::SafeApply => {
                    eligible.insert(step_id.clone());
                }
                Classification::NeedsApproval => {
                    let risk = result
                        .drift_items
                        .iter()
                        .find(|d| &d.id == drift_id)
                        .map(|d| d.severity)
                        .unwrap_or(DriftSeverity::Medium);
                    let request: ApprovalRequest = self.approval_store.request(
                        self.id_gen.as_ref(),
                        drift_id.clone(),
                        step_id.clone(),
                        action_label(diff),
                        risk,
                        self.clock.epoch_ms(),
                    );
                    result.pending_approvals.push(request);
                }
            }
        }

        if !eligible.is_empty() && !cancel.is_cancelled() {
            let apply_out = run_apply(
                &graph,
                &check_out.statuses,
                &eligible,
                &self.executor_config,
                &run_ctx,
            )
            .await;

            for applied in &apply_out.applied {
                let drift_id = drift_by_step
                    .iter()
                    .find(|(step_id, ..)| step_id == &applied.step_id)
                    .map(|(_, drift_id, ..)| drift_id.clone())
                    .expect("every applied step came from a drift item");

                match &applied.result {
                    Ok(()) => {
                        result.remediation_items.push(RemediationItem::success(
                            self.id_gen.next(),
                            drift_id,
                            "apply",
                        ));
                    }
                    Err(e) => {
                        // A directly-failed step is fully represented by its
                        // failed RemediationItem; only a non-recoverable
                        // panic also surfaces as a ReconciliationError here.
                        // An ordinary apply error would otherwise double up
                        // with the RemediationItem above.
                        if applied.panicked {
                            result.errors.push(
                                ReconciliationError::new(Phase::Apply, e.to_string(), false)
                                    .for_step(applied.step_id.to_string()),
                            );
                        }
                        result.remediation_items.push(RemediationItem::failure(
                            self.id_gen.next(),
                            drift_id,
                            "apply",
                            e.to_string(),
                        ));
                    }
                }
            }

            for skipped in &apply_out.skipped {
                result.errors.push(
                    ReconciliationError::new(Phase::Apply, skipped.reason.clone(), true)
                        .for_step(skipped.step_id.to_string()),
                );
            }
        }

        if cancel.is_cancelled() {
            return self.cancelled(result);
        }

        result.complete(self.clock.epoch_ms());
        result
    }

    fn cancelled(&self, mut result: ReconciliationResult) -> ReconciliationResult {
        result
            .errors
            .push(ReconciliationError::new(Phase::Apply, "cancelled", true));
        result.complete(self.clock.epoch_ms());
        result
    }
}

fn action_label(diff: &Diff) -> String {
    format!("{:?} {}", diff.kind, diff.resource).to_lowercase()
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
