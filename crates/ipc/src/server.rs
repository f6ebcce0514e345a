// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! The control-plane listener: singleton lock discipline, the accept loop,
//! and request dispatch against one running [`Agent`].

use std::fs::{self, File};
use std::os::unix::fs::{FileExt as _, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use preflight_agent::Agent;
use preflight_core::{ApprovalRequestId, Clock};
use preflight_policy::ApprovalStore;
use serde::Serialize;
use serde_json::Value;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;

use crate::error::IpcError;
use crate::protocol_types::{
    ApproveRequestPayload, ApproveResponsePayload, ErrorResponsePayload, Message, MessageType,
    StatusResponsePayload, StopRequestPayload, StopResponsePayload, CODE_INVALID_REQUEST,
};
use crate::wire::{read_message, write_message};

/// How long a connection's request line has to arrive before the server
/// gives up on it.
const READ_DEADLINE: Duration = Duration::from_secs(30);
/// How long a response write has to complete.
const WRITE_DEADLINE: Duration = Duration::from_secs(5);
/// Default bound on how long a non-`force` `stop_request` waits for the
/// agent to settle, when the caller doesn't supply `timeout_seconds`.
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

fn encode(payload: impl Serialize) -> Value {
    serde_json::to_value(payload).unwrap_or_else(|e| {
        tracing::error!("failed to encode response payload: {e}");
        Value::Null
    })
}

fn error_response(request_id: Option<String>, code: &str, message: String) -> Message {
    Message::new(
        MessageType::ErrorResponse,
        request_id,
        encode(ErrorResponsePayload { code: code.to_string(), message }),
    )
}

/// The handlers behind each request type, independent of connection
/// plumbing so they can be unit tested without a socket.
pub struct Handlers {
    pub agent: Arc<Agent>,
    pub approvals: Arc<ApprovalStore>,
    pub clock: Arc<dyn Clock>,
    pub version: String,
    pub pid: u32,
}

impl Handlers {
    pub async fn dispatch(&self, message: Message) -> Message {
        match message.message_type {
            MessageType::StatusRequest => self.status_request(message.request_id),
            MessageType::StopRequest => self.stop_request(message.request_id, message.payload).await,
            MessageType::ApproveRequest => self.approve_request(message.request_id, message.payload),
            other => error_response(
                message.request_id,
                CODE_INVALID_REQUEST,
                format!("{other:?} is not a request this server accepts"),
            ),
        }
    }

    fn status_request(&self, request_id: Option<String>) -> Message {
        let payload = StatusResponsePayload {
            status: self.agent.status(),
            version: Some(self.version.clone()),
            pid: self.pid,
        };
        Message::new(MessageType::StatusResponse, request_id, encode(payload))
    }

    /// `force` skips waiting for the agent to settle and reports success as
    /// soon as the stop has been requested; otherwise the call blocks (up to
    /// `timeout_seconds`, or [`DEFAULT_STOP_TIMEOUT`]) for the agent to
    /// actually reach `stopped`.
    async fn stop_request(&self, request_id: Option<String>, payload: Option<Value>) -> Message {
        let req: StopRequestPayload = payload
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        if req.force {
            let agent = Arc::clone(&self.agent);
            tokio::spawn(async move { agent.stop().await });
            let payload = StopResponsePayload { success: true, message: Some("stop requested".to_string()) };
            return Message::new(MessageType::StopResponse, request_id, encode(payload));
        }

        let timeout = req.timeout_seconds.map(Duration::from_secs).unwrap_or(DEFAULT_STOP_TIMEOUT);
        let (success, message) = match tokio::time::timeout(timeout, self.agent.stop()).await {
            Ok(()) => (true, None),
            Err(_) => (false, Some("timed out waiting for the agent to stop".to_string())),
        };
        Message::new(MessageType::StopResponse, request_id, encode(StopResponsePayload { success, message }))
    }

    /// Unknown or expired ids come back as `{success: false}`, never as
    /// `error_response` — an approval racing its own expiry is an ordinary
    /// outcome, not a protocol error.
    fn approve_request(&self, request_id: Option<String>, payload: Option<Value>) -> Message {
        let Some(req) = payload.and_then(|v| serde_json::from_value::<ApproveRequestPayload>(v).ok()) else {
            return error_response(request_id, CODE_INVALID_REQUEST, "approve_request requires a request_id".to_string());
        };

        let now_ms = self.clock.epoch_ms();
        let outcome = self.approvals.approve(&ApprovalRequestId::new(req.request_id.clone()), now_ms);
        let (success, message) = match outcome {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        let payload = ApproveResponsePayload { success, request_id: req.request_id, message };
        Message::new(MessageType::ApproveResponse, request_id, encode(payload))
    }
}

/// The bound listener plus the lock-file discipline that makes it a
/// singleton: only one server can hold `lock_path` at a time, and `start`
/// fails fast (rather than blocking) if another one already does.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
}

impl IpcServer {
    /// Acquire the singleton lock, then bind the socket. Lock first: if
    /// another agent already holds it, we fail before touching the socket
    /// path at all, leaving its listener undisturbed.
    pub fn start(socket_path: &Path, lock_path: &Path) -> Result<Self, IpcError> {
        if let Some(dir) = lock_path.parent() {
            fs::create_dir_all(dir)?;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }

        // Open without truncating: if another process already holds this
        // lock, its pid content must survive our failed attempt untouched.
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| IpcError::LockFailed(lock_path.to_path_buf(), e))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|e| IpcError::LockFailed(lock_path.to_path_buf(), e))?;

        // Only safe to rewrite the file's contents once we actually hold
        // the lock.
        lock_file.set_len(0)?;
        lock_file.write_all_at(std::process::id().to_string().as_bytes(), 0)?;
        fs::set_permissions(lock_path, fs::Permissions::from_mode(0o600))?;

        if socket_path.exists() {
            fs::remove_file(socket_path)?;
        }
        let listener = UnixListener::bind(socket_path).map_err(|e| IpcError::BindFailed(socket_path.to_path_buf(), e))?;
        fs::set_permissions(socket_path, fs::Permissions::from_mode(0o600))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
            lock_path: lock_path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Accept connections until `shutdown` fires, then clean up the socket
    /// and lock files so the next `start` doesn't find stale state.
    pub async fn serve(self, handlers: Arc<Handlers>, shutdown: Arc<Notify>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let handlers = Arc::clone(&handlers);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, handlers).await {
                                    tracing::debug!("connection ended: {e}");
                                }
                            });
                        }
                        Err(e) => tracing::warn!("accept failed: {e}"),
                    }
                }
                () = shutdown.notified() => break,
            }
        }

        let _ = fs::remove_file(&self.socket_path);
        let _ = fs::remove_file(&self.lock_path);
    }
}

async fn handle_connection(stream: UnixStream, handlers: Arc<Handlers>) -> Result<(), crate::error::ConnectionError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = read_message(&mut reader, READ_DEADLINE).await?;
    let response = handlers.dispatch(request).await;
    write_message(&mut write_half, &response, WRITE_DEADLINE).await?;
    Ok(())
}
