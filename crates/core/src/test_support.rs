// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::diff::Diff;
use crate::drift::{DriftItem, DriftItemId, DriftSeverity};
use crate::provider::{CompileContext, Provider, ProviderError};
use crate::remediation::RemediationItem;
use crate::step::{ExplainContext, Explanation, RunContext, Step, StepError, StepId, StepStatus};

// ── Fixture factories ───────────────────────────────────────────────────────

pub fn drift_item(id: &str, step_id: &str, diff: Diff, severity: DriftSeverity) -> DriftItem {
    DriftItem {
        id: DriftItemId::new(id),
        step_id: StepId::parse(step_id).expect("valid step id in test fixture"),
        diff,
        severity,
    }
}

pub fn remediation_success(id: &str, drift_id: &str, action: &str) -> RemediationItem {
    RemediationItem::success(id, DriftItemId::new(drift_id), action)
}

pub fn remediation_failure(id: &str, drift_id: &str, action: &str, message: &str) -> RemediationItem {
    RemediationItem::failure(id, DriftItemId::new(drift_id), action, message)
}

// ── FakeStep ─────────────────────────────────────────────────────────────

/// Scripted outcome for one of [`FakeStep`]'s phases.
#[derive(Clone)]
pub enum Outcome<T: Clone> {
    Ok(T),
    Err(String),
}

/// A [`Step`] whose check/plan/apply outcomes are scripted up front and
/// whose apply calls are counted, for asserting idempotence and call order.
pub struct FakeStep {
    id: StepId,
    depends_on: Vec<StepId>,
    check_result: Outcome<StepStatus>,
    plan_result: Outcome<Diff>,
    apply_result: Outcome<()>,
    reversible: bool,
    severity: Option<DriftSeverity>,
    apply_calls: Arc<Mutex<u32>>,
}

impl FakeStep {
    pub fn new(id: &str) -> Self {
        Self {
            id: StepId::parse(id).expect("valid step id in test fixture"),
            depends_on: Vec::new(),
            check_result: Outcome::Ok(StepStatus::Satisfied),
            plan_result: Outcome::Ok(Diff::add("test", "test", "test")),
            apply_result: Outcome::Ok(()),
            reversible: false,
            severity: None,
            apply_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.depends_on = ids
            .iter()
            .map(|s| StepId::parse(*s).expect("valid step id in test fixture"))
            .collect();
        self
    }

    pub fn needs_apply(mut self) -> Self {
        self.check_result = Outcome::Ok(StepStatus::NeedsApply);
        self
    }

    pub fn satisfied(mut self) -> Self {
        self.check_result = Outcome::Ok(StepStatus::Satisfied);
        self
    }

    pub fn check_fails(mut self, message: &str) -> Self {
        self.check_result = Outcome::Err(message.to_string());
        self
    }

    pub fn plan_returns(mut self, diff: Diff) -> Self {
        self.plan_result = Outcome::Ok(diff);
        self
    }

    pub fn apply_fails(mut self, message: &str) -> Self {
        self.apply_result = Outcome::Err(message.to_string());
        self
    }

    pub fn reversible(mut self) -> Self {
        self.reversible = true;
        self
    }

    pub fn with_severity(mut self, severity: DriftSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn apply_call_count(&self) -> u32 {
        *self.apply_calls.lock()
    }
}

#[async_trait]
impl Step for FakeStep {
    fn id(&self) -> &StepId {
        &self.id
    }

    fn depends_on(&self) -> &[StepId] {
        &self.depends_on
    }

    async fn check(&self, _ctx: &RunContext) -> Result<StepStatus, StepError> {
        match &self.check_result {
            Outcome::Ok(status) => Ok(*status),
            Outcome::Err(msg) => Err(StepError::new(msg.clone())),
        }
    }

    async fn plan(&self, _ctx: &RunContext) -> Result<Diff, StepError> {
        match &self.plan_result {
            Outcome::Ok(diff) => Ok(diff.clone()),
            Outcome::Err(msg) => Err(StepError::new(msg.clone())),
        }
    }

    async fn apply(&self, _ctx: &RunContext) -> Result<(), StepError> {
        *self.apply_calls.lock() += 1;
        match &self.apply_result {
            Outcome::Ok(()) => Ok(()),
            Outcome::Err(msg) => Err(StepError::new(msg.clone())),
        }
    }

    fn explain(&self, _ctx: &ExplainContext) -> Explanation {
        Explanation {
            summary: format!("fake step {}", self.id),
            detail: "scripted test step".to_string(),
            doc_links: Vec::new(),
            tradeoffs: Vec::new(),
        }
    }

    fn is_reversible(&self) -> bool {
        self.reversible
    }

    fn severity(&self) -> Option<DriftSeverity> {
        self.severity
    }
}

// ── FakeProvider / MapCompileContext ────────────────────────────────────

/// A [`CompileContext`] backed by a plain map, for tests that don't need a
/// real manifest parser.
#[derive(Default)]
pub struct MapCompileContext(HashMap<String, serde_json::Value>);

impl MapCompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }
}

impl CompileContext for MapCompileContext {
    fn get_section(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }
}

/// A [`Provider`] that returns a fixed, pre-built list of steps (or a
/// scripted failure) regardless of the compile context it's given.
pub struct FakeProvider {
    name: String,
    steps: Mutex<Vec<Option<Box<dyn Step>>>>,
    fails_with: Option<String>,
}

impl FakeProvider {
    pub fn new(name: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Self {
        Self {
            name: name.into(),
            steps: Mutex::new(steps.into_iter().map(Some).collect()),
            fails_with: None,
        }
    }

    pub fn failing(name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Mutex::new(Vec::new()),
            fails_with: Some(cause.into()),
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn compile(&self, _ctx: &dyn CompileContext) -> Result<Vec<Box<dyn Step>>, ProviderError> {
        if let Some(cause) = &self.fails_with {
            return Err(ProviderError::new(self.name.clone(), cause.clone()));
        }
        Ok(self.steps.lock().iter_mut().filter_map(|s| s.take()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_step_counts_apply_calls() {
        let step = FakeStep::new("provider:kind:name").needs_apply();
        step.apply(&RunContext).await.unwrap();
        step.apply(&RunContext).await.unwrap();
        assert_eq!(step.apply_call_count(), 2);
    }

    #[tokio::test]
    async fn fake_step_check_fails_propagates_message() {
        let step = FakeStep::new("provider:kind:name").check_fails("boom");
        let err = step.check(&RunContext).await.unwrap_err();
        assert_eq!(err.0, "boom");
    }
}
