// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! RemediationItem: the post-Apply record for one DriftItem.

use serde::{Deserialize, Serialize};

use crate::drift::DriftItemId;

/// Record of an Apply attempt that resolves one drift item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationItem {
    pub id: String,
    pub drift_id: DriftItemId,
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RemediationItem {
    pub fn success(id: impl Into<String>, drift_id: DriftItemId, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            drift_id,
            action: action.into(),
            success: true,
            message: None,
        }
    }

    pub fn failure(
        id: impl Into<String>,
        drift_id: DriftItemId,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            drift_id,
            action: action.into(),
            success: false,
            message: Some(message.into()),
        }
    }
}
