// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Wire format: length-unframed newline-delimited JSON records, one
//! [`Message`] per line. This intentionally does NOT reuse a 4-byte
//! length-prefix framing — the wire contract here is explicit about
//! newline delimiting instead.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::protocol_types::Message;

/// Generous ceiling on one line's length, guarding against a misbehaving
/// peer streaming an unbounded line and exhausting memory.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line exceeded {MAX_LINE_BYTES} bytes")]
    LineTooLong,
    #[error("connection closed before a full message was read")]
    ConnectionClosed,
    #[error("timed out waiting for the peer")]
    Timeout,
}

/// Read one newline-delimited JSON [`Message`] from `reader`, bounded by
/// `deadline`.
pub async fn read_message<R>(reader: &mut BufReader<R>, deadline: std::time::Duration) -> Result<Message, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = tokio::time::timeout(deadline, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    if read == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLong);
    }

    Ok(serde_json::from_str(line.trim_end())?)
}

/// Write one [`Message`] as a single newline-delimited JSON line, bounded by
/// `deadline`.
pub async fn write_message<W>(writer: &mut W, message: &Message, deadline: std::time::Duration) -> Result<(), ProtocolError>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    tokio::time::timeout(deadline, async {
        writer.write_all(&line).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol_types::MessageType;
    use std::time::Duration;

    #[tokio::test]
    async fn round_trips_one_message() {
        let message = Message::new(
            MessageType::StatusRequest,
            Some("req-1".to_string()),
            serde_json::json!({}),
        );

        let mut buf = Vec::new();
        write_message(&mut buf, &message, Duration::from_secs(1)).await.unwrap();

        let mut reader = BufReader::new(&buf[..]);
        let decoded = read_message(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert_eq!(decoded.message_type, MessageType::StatusRequest);
        assert_eq!(decoded.request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn empty_stream_is_connection_closed() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_message(&mut reader, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }
}
