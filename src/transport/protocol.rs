//! Completion wire protocol
//!
//! A walker that runs in its own process reports to the coordinator with a
//! single framed message over TCP. There is exactly one message kind.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Walker (rank N)
//!     |                              |
//!     |<----- COMPLETION(steps) -----|
//!     |                              |
//!     |<----------- EOF -------------|
//! ```
//!
//! No acknowledgment is sent back.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use super::CompletionSignal;
use crate::group::Rank;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Tag carried by every completion message
pub const COMPLETION_TAG: i32 = 0;

/// Largest frame body accepted from a peer
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Completion message (Walker → Coordinator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// Rank of the sending walker
    pub source: Rank,

    /// Message tag, always [`COMPLETION_TAG`]
    pub tag: i32,

    /// Step count at which the walk stopped
    pub steps: i32,
}

impl CompletionMessage {
    pub fn new(signal: CompletionSignal) -> Self {
        Self {
            source: signal.source,
            tag: COMPLETION_TAG,
            steps: signal.steps,
        }
    }

    /// Check the tag, yielding the signal carried
    pub fn into_signal(self) -> std::result::Result<CompletionSignal, ProtocolError> {
        if self.tag != COMPLETION_TAG {
            return Err(ProtocolError::UnexpectedTag {
                rank: self.source,
                tag: self.tag,
            });
        }
        Ok(CompletionSignal {
            source: self.source,
            steps: self.steps,
        })
    }
}

/// Protocol violations detected by the coordinator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unexpected message tag {tag} from rank {rank}")]
    UnexpectedTag { rank: Rank, tag: i32 },

    #[error("Frame too large: {0} bytes (max {max})", max = MAX_FRAME_LEN)]
    FrameTooLarge(usize),
}

/// Serialize a message to bytes
///
/// Prepends a 4-byte length field for framing.
pub fn serialize_message(msg: &CompletionMessage) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg)
        .context("Failed to serialize message")?;

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from bytes
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(CompletionMessage, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for message length (need 4 bytes, got {})", buf.len());
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(msg_len).into());
    }

    if buf.len() < 4 + msg_len {
        anyhow::bail!("Incomplete message (need {} bytes, got {})", 4 + msg_len, buf.len());
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

/// Read one complete message from a stream
///
/// Returns `None` when the peer closes the stream cleanly between frames.
pub async fn read_message<S>(stream: &mut S) -> Result<Option<CompletionMessage>>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    let first = stream.read(&mut len_buf).await
        .context("Failed to read message length")?;
    if first == 0 {
        return Ok(None);
    }
    if first < len_buf.len() {
        stream.read_exact(&mut len_buf[first..]).await
            .context("Failed to read message length")?;
    }

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(msg_len).into());
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf).await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf)
        .context("Failed to deserialize message")?;

    Ok(Some(msg))
}

/// Write a message to a stream and flush it
pub async fn write_message<S>(stream: &mut S, msg: &CompletionMessage) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await
        .context("Failed to write message")?;

    stream.flush().await
        .context("Failed to flush stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(source: Rank, steps: i32) -> CompletionMessage {
        CompletionMessage::new(CompletionSignal { source, steps })
    }

    #[test]
    fn test_serialize_deserialize_completion() {
        let msg = message(3, 417);

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(deserialized, msg);
        assert_eq!(deserialized.tag, COMPLETION_TAG);
    }

    #[test]
    fn test_message_framing() {
        let bytes = serialize_message(&message(1, 1)).unwrap();

        assert!(bytes.len() >= 4);
        let msg_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + msg_len);

        // Body is a bare 3-element array: source, tag, steps
        assert_eq!(bytes[4], 0x93);
    }

    #[test]
    fn test_deserialize_incomplete() {
        let bytes = serialize_message(&message(1, 10)).unwrap();
        assert!(deserialize_message(&bytes[..2]).is_err());
        assert!(deserialize_message(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_deserialize_rejects_oversized_frame() {
        let mut bytes = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        let err = deserialize_message(&bytes).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ProtocolError>(),
            Some(&ProtocolError::FrameTooLarge(MAX_FRAME_LEN + 1))
        );
    }

    #[test]
    fn test_into_signal_checks_tag() {
        let signal = message(2, 9).into_signal().unwrap();
        assert_eq!(signal, CompletionSignal { source: 2, steps: 9 });

        let mut tagged = message(2, 9);
        tagged.tag = 7;
        assert_eq!(
            tagged.into_signal(),
            Err(ProtocolError::UnexpectedTag { rank: 2, tag: 7 })
        );
    }

    #[tokio::test]
    async fn test_read_write_over_stream() {
        let (mut client, mut server) = tokio::io::duplex(256);

        write_message(&mut client, &message(5, 77)).await.unwrap();
        write_message(&mut client, &message(6, 78)).await.unwrap();
        drop(client);

        assert_eq!(read_message(&mut server).await.unwrap(), Some(message(5, 77)));
        assert_eq!(read_message(&mut server).await.unwrap(), Some(message(6, 78)));
        assert_eq!(read_message(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_truncated_body_is_error() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let bytes = serialize_message(&message(1, 5)).unwrap();
        client.write_all(&bytes[..bytes.len() - 1]).await.unwrap();
        drop(client);

        assert!(read_message(&mut server).await.is_err());
    }
}
