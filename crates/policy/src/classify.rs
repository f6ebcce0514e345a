// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Drift classification: maps each drift item to an action given the
//! configured remediation policy.

use serde::{Deserialize, Serialize};

/// Global drift-handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationPolicy {
    /// No remediation; drift is recorded only.
    Notify,
    /// Apply every detected drift.
    Auto,
    /// Every remediation requires explicit approval.
    Approved,
    /// Apply remediations the underlying step declares reversible; others
    /// require approval.
    Safe,
}

/// Classification outcome for one drift item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    AutoApply,
    SafeApply,
    NeedsApproval,
    NotifyOnly,
}

/// Classify one drift item under `policy`, given whether its underlying
/// step declares itself reversible.
pub fn classify(policy: RemediationPolicy, is_reversible: bool) -> Classification {
    match policy {
        RemediationPolicy::Notify => Classification::NotifyOnly,
        RemediationPolicy::Auto => Classification::AutoApply,
        RemediationPolicy::Safe => {
            if is_reversible {
                Classification::SafeApply
            } else {
                Classification::NeedsApproval
            }
        }
        RemediationPolicy::Approved => Classification::NeedsApproval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        notify = { RemediationPolicy::Notify, false, Classification::NotifyOnly },
        auto_irreversible = { RemediationPolicy::Auto, false, Classification::AutoApply },
        auto_reversible = { RemediationPolicy::Auto, true, Classification::AutoApply },
        approved = { RemediationPolicy::Approved, true, Classification::NeedsApproval },
        safe_reversible = { RemediationPolicy::Safe, true, Classification::SafeApply },
        safe_irreversible = { RemediationPolicy::Safe, false, Classification::NeedsApproval },
    )]
    fn classifies_by_policy_and_reversibility(
        policy: RemediationPolicy,
        reversible: bool,
        expected: Classification,
    ) {
        assert_eq!(classify(policy, reversible), expected);
    }
}
