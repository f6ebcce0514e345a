// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Diff: the descriptive output of a step's Plan phase.

use serde::{Deserialize, Serialize};

/// Kind of change a [`Diff`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Add,
    Modify,
    Remove,
}

/// Purely descriptive record of a planned change. Produced by `Step::plan`
/// and aggregated by the reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    #[serde(rename = "type")]
    pub kind: DiffKind,
    pub resource: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl Diff {
    pub fn add(resource: impl Into<String>, name: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Add,
            resource: resource.into(),
            name: name.into(),
            old_value: None,
            new_value: Some(new_value.into()),
        }
    }

    pub fn modify(
        resource: impl Into<String>,
        name: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiffKind::Modify,
            resource: resource.into(),
            name: name.into(),
            old_value: Some(old_value.into()),
            new_value: Some(new_value.into()),
        }
    }

    pub fn remove(resource: impl Into<String>, name: impl Into<String>, old_value: impl Into<String>) -> Self {
        Self {
            kind: DiffKind::Remove,
            resource: resource.into(),
            name: name.into(),
            old_value: Some(old_value.into()),
            new_value: None,
        }
    }

    /// True when `resource` is conventionally marked safety-critical (a
    /// leading `!`), used by the default severity mapping.
    pub fn is_safety_critical_resource(&self) -> bool {
        self.resource.starts_with('!')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_critical_resource_convention() {
        let d = Diff::modify("!disk-encryption", "status", "off", "on");
        assert!(d.is_safety_critical_resource());

        let d = Diff::modify("git-config", "user.name", "old", "new");
        assert!(!d.is_safety_critical_resource());
    }
}
