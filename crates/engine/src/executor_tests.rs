// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use std::collections::HashSet;

use preflight_core::test_support::{FakeProvider, FakeStep};
use preflight_core::{Provider, RunContext, StepId, StepStatus};

use super::*;
use crate::compiler::compile;

async fn compile_steps(steps: Vec<Box<dyn preflight_core::Step>>) -> StepGraph {
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(FakeProvider::new("test", steps))];
    compile(&providers, &preflight_core::test_support::MapCompileContext::new())
        .await
        .unwrap()
}

fn id(s: &str) -> StepId {
    StepId::parse(s).unwrap()
}

#[tokio::test]
async fn empty_graph_check_and_plan_is_empty() {
    let graph = compile_steps(vec![]).await;
    let out = run_check_and_plan(&graph, &RunContext).await;
    assert!(out.statuses.is_empty());
    assert!(out.plans.is_empty());
    assert!(out.blocked.is_empty());
}

#[tokio::test]
async fn satisfied_step_produces_no_plan_entry() {
    let graph = compile_steps(vec![Box::new(FakeStep::new("p:kind:a").satisfied())]).await;
    let out = run_check_and_plan(&graph, &RunContext).await;
    assert_eq!(out.statuses.get(&id("p:kind:a")), Some(&StepStatus::Satisfied));
    assert!(out.plans.is_empty());
}

#[tokio::test]
async fn needs_apply_step_produces_a_plan_entry() {
    let graph = compile_steps(vec![Box::new(FakeStep::new("p:kind:a").needs_apply())]).await;
    let out = run_check_and_plan(&graph, &RunContext).await;
    assert_eq!(out.plans.len(), 1);
    assert_eq!(out.plans[0].step_id, id("p:kind:a"));
}

#[tokio::test]
async fn unknown_check_blocks_dependent_subtree() {
    let graph = compile_steps(vec![
        Box::new(FakeStep::new("p:kind:a").check_fails("tool missing")),
        Box::new(FakeStep::new("p:kind:b").depends_on(&["p:kind:a"]).needs_apply()),
    ])
    .await;
    let out = run_check_and_plan(&graph, &RunContext).await;

    assert_eq!(out.blocked.len(), 2);
    let blocked_ids: HashSet<_> = out.blocked.iter().map(|b| b.step_id.clone()).collect();
    assert!(blocked_ids.contains(&id("p:kind:a")));
    assert!(blocked_ids.contains(&id("p:kind:b")));
    // b's check was never invoked, so it never reached the plan phase.
    assert!(out.plans.is_empty());
}

#[tokio::test]
async fn apply_marks_success_and_is_idempotent_on_already_satisfied() {
    let step = FakeStep::new("p:kind:a").needs_apply();
    let graph = compile_steps(vec![Box::new(step)]).await;

    let check_out = run_check_and_plan(&graph, &RunContext).await;
    let eligible: HashSet<StepId> = check_out.plans.iter().map(|p| p.step_id.clone()).collect();

    let apply_out = run_apply(&graph, &check_out.statuses, &eligible, &ExecutorConfig::default(), &RunContext).await;
    assert_eq!(apply_out.applied.len(), 1);
    assert!(apply_out.applied[0].result.is_ok());
}

#[tokio::test]
async fn apply_failure_skips_dependent_step() {
    let graph = compile_steps(vec![
        Box::new(FakeStep::new("p:kind:a").needs_apply().apply_fails("disk full")),
        Box::new(FakeStep::new("p:kind:b").depends_on(&["p:kind:a"]).needs_apply()),
    ])
    .await;

    let check_out = run_check_and_plan(&graph, &RunContext).await;
    let eligible: HashSet<StepId> = check_out.plans.iter().map(|p| p.step_id.clone()).collect();

    let apply_out = run_apply(&graph, &check_out.statuses, &eligible, &ExecutorConfig::default(), &RunContext).await;

    assert_eq!(apply_out.applied.len(), 1);
    assert!(apply_out.applied[0].result.is_err());
    assert_eq!(apply_out.skipped.len(), 1);
    assert_eq!(apply_out.skipped[0].step_id, id("p:kind:b"));
}

#[tokio::test]
async fn dependency_not_eligible_this_cycle_blocks_dependent() {
    let graph = compile_steps(vec![
        Box::new(FakeStep::new("p:kind:a").needs_apply()),
        Box::new(FakeStep::new("p:kind:b").depends_on(&["p:kind:a"]).needs_apply()),
    ])
    .await;

    let check_out = run_check_and_plan(&graph, &RunContext).await;
    // Only b is eligible this cycle (a is NeedsApply but, e.g., still
    // awaiting approval) — a is neither Satisfied nor just-applied, so b
    // must not run.
    let eligible: HashSet<StepId> = [id("p:kind:b")].into_iter().collect();

    let apply_out = run_apply(&graph, &check_out.statuses, &eligible, &ExecutorConfig::default(), &RunContext).await;

    assert!(apply_out.applied.is_empty());
    assert_eq!(apply_out.skipped.len(), 1);
    assert_eq!(apply_out.skipped[0].step_id, id("p:kind:b"));
}

#[tokio::test]
async fn dry_run_applies_nothing() {
    let graph = compile_steps(vec![Box::new(FakeStep::new("p:kind:a").needs_apply())]).await;
    let check_out = run_check_and_plan(&graph, &RunContext).await;
    let eligible: HashSet<StepId> = check_out.plans.iter().map(|p| p.step_id.clone()).collect();

    let config = ExecutorConfig {
        concurrency: 4,
        dry_run: true,
    };
    let apply_out = run_apply(&graph, &check_out.statuses, &eligible, &config, &RunContext).await;
    assert!(apply_out.applied.is_empty());
    assert!(apply_out.skipped.is_empty());
}

#[tokio::test]
async fn independent_needs_apply_steps_all_apply() {
    let graph = compile_steps(vec![
        Box::new(FakeStep::new("p:kind:a").needs_apply()),
        Box::new(FakeStep::new("p:kind:b").needs_apply()),
        Box::new(FakeStep::new("p:kind:c").satisfied()),
    ])
    .await;

    let check_out = run_check_and_plan(&graph, &RunContext).await;
    let eligible: HashSet<StepId> = check_out.plans.iter().map(|p| p.step_id.clone()).collect();
    assert_eq!(eligible.len(), 2);

    let apply_out = run_apply(&graph, &check_out.statuses, &eligible, &ExecutorConfig::default(), &RunContext).await;
    assert_eq!(apply_out.applied.len(), 2);
    assert!(apply_out.applied.iter().all(|a| a.result.is_ok()));
}
