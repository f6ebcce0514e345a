// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! preflight-ipc: the control-plane wire protocol and its listener/client
//! halves (C4).

mod client;
mod error;
mod protocol_types;
mod server;
mod wire;

pub use client::{is_running, send_request};
pub use error::{ClientError, ConnectionError, IpcError};
pub use protocol_types::{
    ApproveRequestPayload, ApproveResponsePayload, ErrorResponsePayload, Message, MessageType,
    StatusResponsePayload, StopRequestPayload, StopResponsePayload, CODE_INTERNAL_ERROR,
    CODE_INVALID_REQUEST, CODE_NOT_FOUND, CODE_NOT_RUNNING, CODE_TIMEOUT,
};
pub use server::{Handlers, IpcServer};
pub use wire::{read_message, write_message, ProtocolError};
