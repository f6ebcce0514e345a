// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Step identity and the Step trait: the primitive unit of work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::diff::Diff;
use crate::drift::DriftSeverity;

/// Stable identity of a step, of the form `provider:kind:name`.
///
/// Matches the interface's `^[a-z][a-z0-9]*(:[a-zA-Z0-9._-]+)+$` — a
/// lowercase-alnum provider tag, followed by one or more `:`-separated
/// segments. Construction is fallible so an invalid identity is a typed
/// error at the boundary rather than a bug discovered at topo-sort time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepIdError {
    #[error("step id {0:?} must have at least one `:`-separated segment after the provider tag")]
    TooFewSegments(String),
    #[error("step id {0:?} provider tag must start with a lowercase letter and contain only lowercase letters/digits")]
    InvalidProviderTag(String),
    #[error("step id {0:?} has an empty or invalid segment {1:?}")]
    InvalidSegment(String, String),
}

impl StepId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, StepIdError> {
        let raw = raw.into();
        let mut parts = raw.split(':');

        let provider = parts.next().unwrap_or("");
        let mut chars = provider.chars();
        let valid_provider = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !valid_provider {
            return Err(StepIdError::InvalidProviderTag(raw));
        }

        let segments: Vec<&str> = parts.collect();
        if segments.is_empty() {
            return Err(StepIdError::TooFewSegments(raw));
        }
        for seg in &segments {
            let ok = !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
            if !ok {
                return Err(StepIdError::InvalidSegment(raw.clone(), seg.to_string()));
            }
        }

        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StepId {
    type Error = StepIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<StepId> for String {
    fn from(id: StepId) -> String {
        id.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of `Step::check`. `Unknown` signals that Check itself failed and
/// is propagated rather than silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Satisfied,
    NeedsApply,
    Unknown,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Satisfied => write!(f, "satisfied"),
            StepStatus::NeedsApply => write!(f, "needs_apply"),
            StepStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Output of `Step::explain`: a human-facing summary plus supporting detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub detail: String,
    #[serde(default)]
    pub doc_links: Vec<String>,
    #[serde(default)]
    pub tradeoffs: Vec<String>,
}

/// Read-only context passed to `Step::check`/`Step::plan`/`Step::apply`.
///
/// Kept minimal and opaque at the core layer: concrete adapters (filesystem,
/// subprocess, network) are an execution-time concern owned by the
/// executor, not by the step trait itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunContext;

/// Context passed to `Step::explain`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplainContext;

/// Error returned by a step's Check/Plan/Apply.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StepError(pub String);

impl StepError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The primitive unit of work: idempotent check/plan/apply/explain against
/// one resource.
///
/// Applying a satisfied step MUST be a no-op; applying twice MUST equal
/// applying once.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable identity, unique across a cycle.
    fn id(&self) -> &StepId;

    /// Other step identities this step depends on.
    fn depends_on(&self) -> &[StepId] {
        &[]
    }

    /// Observe the system and report whether this step is satisfied.
    async fn check(&self, ctx: &RunContext) -> Result<StepStatus, StepError>;

    /// Produce a human-readable diff. Only called when `check` returned
    /// `NeedsApply`.
    async fn plan(&self, ctx: &RunContext) -> Result<Diff, StepError>;

    /// Mutate the system to bring it in line with declared intent.
    async fn apply(&self, ctx: &RunContext) -> Result<(), StepError>;

    /// Summary, doc links, and tradeoffs for this step.
    fn explain(&self, ctx: &ExplainContext) -> Explanation;

    /// Whether applying this step is safely reversible. Defaults to false;
    /// missing accessors are treated as non-reversible by the policy engine.
    fn is_reversible(&self) -> bool {
        false
    }

    /// Severity classification for this step's drift, if the step wants to
    /// override the default derived-from-diff-type mapping.
    fn severity(&self) -> Option<DriftSeverity> {
        None
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
