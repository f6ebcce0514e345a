// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use std::sync::Arc;
use std::time::Duration;

use preflight_core::test_support::{FakeProvider, FakeStep, MapCompileContext};
use preflight_core::{AgentState, Clock, Provider, Schedule, SequentialIdGen, Step, SystemClock};
use preflight_engine::Cycle;
use preflight_policy::{ApprovalStore, RemediationPolicy};

use super::*;

fn cycle_with(steps: Vec<Box<dyn Step>>) -> Arc<Cycle> {
    let providers: Vec<Box<dyn Provider>> = vec![Box::new(FakeProvider::new("test", steps))];
    Arc::new(Cycle::new(
        providers,
        RemediationPolicy::Auto,
        Arc::new(ApprovalStore::default()),
        Arc::new(SystemClock) as Arc<dyn Clock>,
        Arc::new(SequentialIdGen::new("id")),
    ))
}

fn agent_with(steps: Vec<Box<dyn Step>>, schedule: Schedule) -> Agent {
    Agent::new(
        cycle_with(steps),
        Arc::new(MapCompileContext::new()),
        schedule,
        Arc::new(SystemClock) as Arc<dyn Clock>,
    )
}

#[tokio::test]
async fn start_settles_into_running_and_records_start() {
    let agent = agent_with(vec![], Schedule::Interval(Duration::from_secs(3600)));
    assert_eq!(agent.state(), AgentState::Stopped);

    agent.start().await.unwrap();
    assert_eq!(agent.state(), AgentState::Running);
    assert!(agent.status().start_at_ms > 0);

    agent.stop().await;
    assert_eq!(agent.state(), AgentState::Stopped);
}

#[tokio::test]
async fn starting_twice_is_an_error() {
    let agent = agent_with(vec![], Schedule::Interval(Duration::from_secs(3600)));
    agent.start().await.unwrap();
    assert!(matches!(agent.start().await, Err(AgentError::AlreadyStarted)));
    agent.stop().await;
}

#[tokio::test]
async fn restarting_after_stop_is_an_error() {
    let agent = agent_with(vec![], Schedule::Interval(Duration::from_secs(3600)));
    agent.start().await.unwrap();
    agent.stop().await;
    assert!(matches!(agent.start().await, Err(AgentError::AlreadyClosed)));
}

#[tokio::test]
async fn stopping_an_unstarted_agent_is_a_no_op() {
    let agent = agent_with(vec![], Schedule::Interval(Duration::from_secs(3600)));
    agent.stop().await;
    assert_eq!(agent.state(), AgentState::Stopped);
}

#[tokio::test]
async fn scheduler_ticks_and_completes_a_reconcile_cycle() {
    let agent = agent_with(
        vec![Box::new(FakeStep::new("p:kind:a").needs_apply())],
        Schedule::Interval(Duration::from_millis(10)),
    );
    agent.start().await.unwrap();

    // Warmup (200ms) + interval (10ms) + execution, with margin.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(agent.runtime().snapshot().reconcile_count >= 1);
    assert_eq!(agent.state(), AgentState::Running);

    agent.stop().await;
    assert_eq!(agent.state(), AgentState::Stopped);
}

#[tokio::test]
async fn recover_from_error_returns_to_running() {
    let agent = agent_with(vec![], Schedule::Interval(Duration::from_secs(3600)));
    agent.start().await.unwrap();

    agent.runtime().set_state(AgentState::Error);
    agent.recover();
    assert_eq!(agent.state(), AgentState::Running);

    agent.stop().await;
}
