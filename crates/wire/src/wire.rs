// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing: a 4-byte big-endian length prefix followed by a JSON body.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Request, Response};

/// Frames larger than this are rejected outright rather than allocating an
/// unbounded buffer for a malformed or hostile length prefix.
const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit")]
    FrameTooLarge { len: u32 },
    #[error("malformed json body: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(value)?;
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge { len: u32::MAX })?;
    let mut framed = Vec::with_capacity(4 + body.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(body)?)
}

/// Read one length-prefixed frame's body off `reader`.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge { len });
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write `body` as one length-prefixed frame to `writer`.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge { len: u32::MAX })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Write a value as one complete length-prefixed frame (header included).
async fn write_framed<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, value: &T) -> Result<(), ProtocolError> {
    let framed = encode(value)?;
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    let body = read_message(reader).await?;
    decode(&body)
}

pub async fn write_request<W: AsyncWrite + Unpin>(writer: &mut W, request: &Request) -> Result<(), ProtocolError> {
    write_framed(writer, request).await
}

pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Response, ProtocolError> {
    let body = read_message(reader).await?;
    decode(&body)
}

pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<(), ProtocolError> {
    write_framed(writer, response).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusSummary;

    #[tokio::test]
    async fn encode_then_read_message_round_trips() {
        let request = Request::Status;
        let framed = encode(&request).unwrap();

        let mut cursor = std::io::Cursor::new(framed);
        let body = read_message(&mut cursor).await.unwrap();
        let decoded: Request = decode(&body).unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn write_then_read_response_round_trips() {
        let response = Response::Status(StatusSummary::default());
        let mut buf = Vec::new();
        write_response(&mut buf, &response).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded = read_request(&mut cursor).await;
        assert!(decoded.is_err(), "a Response frame is not a valid Request");
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let mut framed = Vec::new();
        framed.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(framed);
        let result = read_message(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn request_reload_round_trips_through_the_socket_helpers() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let sent = Request::Reload;
        write_request(&mut client, &sent).await.unwrap();

        let received = read_request(&mut server).await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn response_status_round_trips_through_the_socket_helpers() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let sent = Response::Status(StatusSummary::default());
        write_response(&mut client, &sent).await.unwrap();

        let received = read_response(&mut server).await.unwrap();
        assert_eq!(received, sent);
    }
}
