// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Provider: the pluggable interface compiling manifest sections into steps.

use async_trait::async_trait;
use thiserror::Error;

use crate::step::Step;

/// Read-only access to parsed configuration sections by name. Manifest
/// parsing and layer-merging live outside the core (an external
/// collaborator); this trait is the seam providers see.
pub trait CompileContext: Send + Sync {
    /// Returns the raw config value for a named section, or `None` if the
    /// manifest does not declare one.
    fn get_section(&self, name: &str) -> Option<&serde_json::Value>;
}

#[derive(Debug, Error)]
#[error("provider {provider} failed to compile: {cause}")]
pub struct ProviderError {
    pub provider: String,
    pub cause: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            cause: cause.into(),
        }
    }
}

/// Plugin that compiles a config section into zero or more steps. Providers
/// never execute — execution is the executor's job.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn compile(&self, ctx: &dyn CompileContext) -> Result<Vec<Box<dyn Step>>, ProviderError>;
}
