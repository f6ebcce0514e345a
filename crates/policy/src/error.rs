// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("approval request {0} not found or expired")]
    NotFound(String),
}
