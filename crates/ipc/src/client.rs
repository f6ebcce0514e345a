// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Client-side helpers: the liveness probe and a one-shot request/response
//! round trip, shared by the CLI and anything else that talks to a running
//! agent over its control socket.

use std::path::Path;
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::UnixStream;

use crate::error::ClientError;
use crate::protocol_types::{Message, MessageType};
use crate::wire::{read_message, write_message};

/// How long a liveness probe's connect attempt is allowed to take before
/// the agent is considered not running.
const PROBE_DEADLINE: Duration = Duration::from_millis(500);
const REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// An agent is considered running iff its lock file and socket both exist
/// on disk *and* a connect against the socket actually succeeds within
/// [`PROBE_DEADLINE`] — a stale socket left behind by a crashed agent
/// fails the connect and is correctly reported as not running.
pub async fn is_running(socket_path: &Path, lock_path: &Path) -> bool {
    if !lock_path.exists() || !socket_path.exists() {
        return false;
    }
    matches!(
        tokio::time::timeout(PROBE_DEADLINE, UnixStream::connect(socket_path)).await,
        Ok(Ok(_))
    )
}

/// Send one request and wait for its response.
pub async fn send_request(
    socket_path: &Path,
    message_type: MessageType,
    payload: serde_json::Value,
) -> Result<Message, ClientError> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| ClientError::Connect(socket_path.to_path_buf(), e))?;

    let request = Message::new(message_type, None, payload);
    write_message(&mut stream, &request, REQUEST_DEADLINE).await?;

    let mut reader = BufReader::new(stream);
    Ok(read_message(&mut reader, REQUEST_DEADLINE).await?)
}
