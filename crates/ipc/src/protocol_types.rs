// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! DTOs for the newline-delimited JSON wire protocol.

use preflight_core::AgentStatus;
use serde::{Deserialize, Serialize};

/// One wire record. `payload` is the typed body for `message_type`; senders
/// and receivers agree on its shape out of band (by `message_type`), so it
/// stays untyped `serde_json::Value` at this layer rather than an enum with
/// internal tagging, mirroring how the wire contract is specified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Message {
    pub fn new(message_type: MessageType, request_id: Option<String>, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload: Some(payload),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    StatusRequest,
    StatusResponse,
    StopRequest,
    StopResponse,
    ApproveRequest,
    ApproveResponse,
    ErrorResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponsePayload {
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub pid: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopRequestPayload {
    #[serde(default)]
    pub force: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponsePayload {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequestPayload {
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveResponsePayload {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `code` values per the error taxonomy: `invalid_request`, `not_running`,
/// `not_found`, `internal_error`, `timeout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponsePayload {
    pub code: String,
    pub message: String,
}

pub const CODE_INVALID_REQUEST: &str = "invalid_request";
pub const CODE_NOT_RUNNING: &str = "not_running";
pub const CODE_NOT_FOUND: &str = "not_found";
pub const CODE_INTERNAL_ERROR: &str = "internal_error";
pub const CODE_TIMEOUT: &str = "timeout";
