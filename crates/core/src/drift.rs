// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! DriftItem: the post-Check classification of one NeedsApply step.

use serde::{Deserialize, Serialize};

use crate::diff::{Diff, DiffKind};
use crate::step::StepId;

crate::define_id! {
    /// Unique identifier for a drift item within one reconciliation result.
    pub struct DriftItemId;
}

/// Severity of a detected drift. Ordered so policy code and summaries can
/// compare severities directly (`Low < Medium < High < Critical`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DriftSeverity {
    /// Default mapping from a diff's kind to severity when the step does
    /// not override `Step::severity()`.
    ///
    /// `add`/`remove` → medium; `modify` of a resource conventionally
    /// flagged safety-critical (leading `!`) → high; everything else →
    /// medium. Providers are expected to document their own mapping via
    /// `Step::severity()` when this default is wrong for them.
    pub fn default_for_diff(diff: &Diff) -> Self {
        match diff.kind {
            DiffKind::Add | DiffKind::Remove => DriftSeverity::Medium,
            DiffKind::Modify if diff.is_safety_critical_resource() => DriftSeverity::High,
            DiffKind::Modify => DriftSeverity::Medium,
        }
    }
}

/// Observed divergence between declared intent and system reality, derived
/// from one step whose `check` returned `NeedsApply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftItem {
    pub id: DriftItemId,
    pub step_id: StepId,
    pub diff: Diff,
    pub severity: DriftSeverity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_severity_for_add_is_medium() {
        let diff = Diff::add("git-config", "user.name", "me");
        assert_eq!(DriftSeverity::default_for_diff(&diff), DriftSeverity::Medium);
    }

    #[test]
    fn default_severity_for_safety_critical_modify_is_high() {
        let diff = Diff::modify("!disk-encryption", "status", "off", "on");
        assert_eq!(DriftSeverity::default_for_diff(&diff), DriftSeverity::High);
    }

    #[test]
    fn severities_are_ordered() {
        assert!(DriftSeverity::Low < DriftSeverity::Medium);
        assert!(DriftSeverity::Medium < DriftSeverity::High);
        assert!(DriftSeverity::High < DriftSeverity::Critical);
    }
}
