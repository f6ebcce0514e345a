// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use std::path::PathBuf;
use thiserror::Error;

use crate::wire::ProtocolError;

/// Errors from starting the control-plane listener.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("failed to acquire lock at {0}: agent already running?")]
    LockFailed(PathBuf, #[source] std::io::Error),
    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from one accepted connection. The listener logs these and moves
/// on; they never reach the client as anything but a dropped connection,
/// since by definition something went wrong before a response could be
/// framed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors from a client-side request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {0}: {1}")]
    Connect(PathBuf, std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}
