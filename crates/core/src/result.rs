// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! ReconciliationResult: the immutable record of one reconciliation cycle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::approval::ApprovalRequest;
use crate::drift::DriftItem;
use crate::remediation::RemediationItem;

/// Phase in which a [`ReconciliationError`] occurred. A closed enum so
/// callers match on error *kind*, never on a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Compile,
    Check,
    Plan,
    Apply,
    Record,
}

/// One error encountered during a cycle, attached to the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationError {
    pub phase: Phase,
    pub message: String,
    pub recoverable: bool,
    /// Step this error is attributed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl ReconciliationError {
    pub fn new(phase: Phase, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            phase,
            message: message.into(),
            recoverable,
            step_id: None,
        }
    }

    pub fn for_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

/// Immutable record of one Check → Plan → Apply pass over the step graph.
/// Stamped complete by `Complete()`; not mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    pub drift_items: Vec<DriftItem>,
    pub remediation_items: Vec<RemediationItem>,
    pub errors: Vec<ReconciliationError>,
    pub pending_approvals: Vec<ApprovalRequest>,
    complete: bool,
}

impl ReconciliationResult {
    pub fn started(started_at_ms: u64) -> Self {
        Self {
            started_at_ms,
            completed_at_ms: None,
            duration: None,
            drift_items: Vec::new(),
            remediation_items: Vec::new(),
            errors: Vec::new(),
            pending_approvals: Vec::new(),
            complete: false,
        }
    }

    /// Stamp this result complete. Idempotent in the sense that calling it
    /// twice keeps the first completion time, matching "immutable once
    /// Complete() is stamped".
    pub fn complete(&mut self, completed_at_ms: u64) {
        if self.complete {
            return;
        }
        self.completed_at_ms = Some(completed_at_ms);
        self.duration = Some(Duration::from_millis(
            completed_at_ms.saturating_sub(self.started_at_ms),
        ));
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn remediation_applied(&self) -> bool {
        self.remediation_items.iter().any(|r| r.success)
    }

    /// Human-readable summary derived purely from the result's contents.
    pub fn summary(&self) -> String {
        if self.drift_items.is_empty() {
            return "no drift detected".to_string();
        }

        let applied = self.remediation_items.iter().filter(|r| r.success).count();
        let failed = self.remediation_items.iter().filter(|r| !r.success).count();
        let pending = self.pending_approvals.len();

        let mut parts = Vec::new();
        parts.push(format!("{} drift item(s) detected", self.drift_items.len()));
        if applied > 0 {
            parts.push(format!("{} remediated", applied));
        }
        if failed > 0 {
            parts.push(format!("{} failed", failed));
        }
        if pending > 0 {
            parts.push(format!("{} awaiting approval", pending));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_summarizes_as_no_drift() {
        let result = ReconciliationResult::started(0);
        assert_eq!(result.summary(), "no drift detected");
    }

    #[test]
    fn complete_is_idempotent_on_timestamp() {
        let mut result = ReconciliationResult::started(1_000);
        result.complete(1_500);
        result.complete(9_999);
        assert_eq!(result.completed_at_ms, Some(1_500));
        assert_eq!(result.duration, Some(Duration::from_millis(500)));
    }
}
