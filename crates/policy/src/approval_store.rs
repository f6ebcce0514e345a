// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! ApprovalStore: the in-memory map from a pending [`ApprovalRequest`] id to
//! its record, plus the set of drift ids approved since the last cycle.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::Mutex;
use preflight_core::{ApprovalRequest, ApprovalRequestId, DriftItemId, DriftSeverity, IdGen, StepId};

use crate::error::PolicyError;

/// Default time-to-live for a pending approval request.
pub const DEFAULT_APPROVAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A pending approval, keyed by [`ApprovalRequestId`] in the store.
#[derive(Debug, Clone)]
pub struct PendingApproval {
    pub drift_id: DriftItemId,
    pub step_id: StepId,
    pub action: String,
    pub risk: DriftSeverity,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

/// In-memory approval request store. Guarded by a single mutex per the
/// shared-resource policy in §5; operations are O(1) or O(n) over the
/// (small) pending set.
///
/// Grants are tracked by the underlying `StepId`, not the per-cycle
/// `DriftItemId`: a fresh DriftItem is minted every cycle a step still
/// shows drift, so keying the grant on the drift id would never match
/// across cycles.
pub struct ApprovalStore {
    pending: Mutex<HashMap<ApprovalRequestId, PendingApproval>>,
    approved_step_ids: Mutex<HashSet<StepId>>,
    ttl: Duration,
}

impl Default for ApprovalStore {
    fn default() -> Self {
        Self::new(DEFAULT_APPROVAL_TTL)
    }
}

impl ApprovalStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            approved_step_ids: Mutex::new(HashSet::new()),
            ttl,
        }
    }

    /// Record a new approval request for `drift_id` (arising from
    /// `step_id`), returning the request handed back to the caller (and,
    /// via the result, to the client).
    #[allow(clippy::too_many_arguments)]
    pub fn request(
        &self,
        id_gen: &dyn IdGen,
        drift_id: DriftItemId,
        step_id: StepId,
        action: impl Into<String>,
        risk: DriftSeverity,
        now_ms: u64,
    ) -> ApprovalRequest {
        let id = ApprovalRequestId::new(id_gen.next());
        let action = action.into();
        let expires_at_ms = now_ms + self.ttl.as_millis() as u64;
        self.pending.lock().insert(
            id.clone(),
            PendingApproval {
                drift_id: drift_id.clone(),
                step_id,
                action: action.clone(),
                risk,
                created_at_ms: now_ms,
                expires_at_ms,
            },
        );
        ApprovalRequest {
            id,
            drift_id,
            action,
            risk,
            created_at_ms: now_ms,
            expires_at_ms,
        }
    }

    /// Resolve a pending approval. Removes the entry whether it succeeds or
    /// has merely expired, so a repeat `approve` of the same id always
    /// returns not-found.
    pub fn approve(&self, id: &ApprovalRequestId, now_ms: u64) -> Result<DriftItemId, PolicyError> {
        let mut pending = self.pending.lock();
        let entry = pending
            .remove(id)
            .ok_or_else(|| PolicyError::NotFound(id.to_string()))?;

        if now_ms >= entry.expires_at_ms {
            return Err(PolicyError::NotFound(id.to_string()));
        }

        self.approved_step_ids.lock().insert(entry.step_id);
        Ok(entry.drift_id)
    }

    /// Whether `step_id` has a pending approval grant. Consumes the grant
    /// so it applies to exactly one subsequent cycle.
    pub fn consume_approval(&self, step_id: &StepId) -> bool {
        self.approved_step_ids.lock().remove(step_id)
    }

    /// Drop expired entries. Returns the number removed.
    pub fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|_, entry| now_ms < entry.expires_at_ms);
        before - pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_core::SequentialIdGen;

    fn store() -> ApprovalStore {
        ApprovalStore::new(Duration::from_secs(60))
    }

    fn step(raw: &str) -> StepId {
        StepId::parse(raw).unwrap()
    }

    #[test]
    fn approve_then_reapprove_returns_not_found() {
        let store = store();
        let id_gen = SequentialIdGen::new("req");
        let request = store.request(&id_gen, DriftItemId::new("drift-1"), step("p:kind:a"), "apply", DriftSeverity::Medium, 0);

        let drift_id = store.approve(&request.id, 1_000).unwrap();
        assert_eq!(drift_id, DriftItemId::new("drift-1"));
        assert_eq!(store.approve(&request.id, 1_000), Err(PolicyError::NotFound(request.id.to_string())));
    }

    #[test]
    fn approve_unknown_id_is_not_found() {
        let store = store();
        let bogus = ApprovalRequestId::new("does-not-exist");
        assert!(matches!(store.approve(&bogus, 0), Err(PolicyError::NotFound(_))));
    }

    #[test]
    fn approve_after_expiry_is_not_found_and_drops_entry() {
        let store = store();
        let id_gen = SequentialIdGen::new("req");
        let request = store.request(&id_gen, DriftItemId::new("drift-1"), step("p:kind:a"), "apply", DriftSeverity::Medium, 0);

        let err = store.approve(&request.id, 61_000);
        assert!(matches!(err, Err(PolicyError::NotFound(_))));
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn consume_approval_is_one_shot() {
        let store = store();
        let id_gen = SequentialIdGen::new("req");
        let request = store.request(&id_gen, DriftItemId::new("drift-1"), step("p:kind:a"), "apply", DriftSeverity::Medium, 0);
        store.approve(&request.id, 0).unwrap();

        assert!(store.consume_approval(&step("p:kind:a")));
        assert!(!store.consume_approval(&step("p:kind:a")));
    }

    /// A fresh `DriftItemId` is minted every cycle; the grant must still be
    /// found by the step that produced it, not by that per-cycle id.
    #[test]
    fn consume_approval_matches_by_step_id_across_different_drift_ids() {
        let store = store();
        let id_gen = SequentialIdGen::new("req");
        let request = store.request(&id_gen, DriftItemId::new("drift-cycle-1"), step("p:kind:a"), "apply", DriftSeverity::Medium, 0);
        store.approve(&request.id, 0).unwrap();

        assert!(store.consume_approval(&step("p:kind:a")));
    }

    #[test]
    fn sweep_expired_removes_only_expired_entries() {
        let store = store();
        let id_gen = SequentialIdGen::new("req");
        store.request(&id_gen, DriftItemId::new("drift-1"), step("p:kind:a"), "apply", DriftSeverity::Low, 0);
        store.request(&id_gen, DriftItemId::new("drift-2"), step("p:kind:b"), "apply", DriftSeverity::Low, 50_000);

        let removed = store.sweep_expired(61_000);
        assert_eq!(removed, 1);
        assert_eq!(store.pending_count(), 1);
    }
}
