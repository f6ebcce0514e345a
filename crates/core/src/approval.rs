// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! ApprovalRequest: issued when policy demands human consent before Apply.

use serde::{Deserialize, Serialize};

use crate::drift::DriftItemId;

crate::define_id! {
    /// Unique identifier for an approval request. Fresh per request;
    /// matched against on resolution.
    pub struct ApprovalRequestId;
}

/// A pending approval awaiting (or having received) human consent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalRequestId,
    pub drift_id: DriftItemId,
    pub action: String,
    pub risk: crate::drift::DriftSeverity,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl ApprovalRequest {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}
