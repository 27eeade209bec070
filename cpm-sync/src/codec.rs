//! Length-prefixed JSON framing for replication messages.
//!
//! Each frame is a 4-byte big-endian body length followed by the JSON body.
//! Bundle byte fields are base64 inside the JSON.

use crate::error::{SyncError, SyncResult};
use crate::protocol::ReplicationMessage;
use futures::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use std::io;

/// Maximum frame body size (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Size of the length prefix.
const PREFIX_LEN: usize = 4;

fn check_len(len: usize) -> SyncResult<u32> {
    u32::try_from(len)
        .ok()
        .filter(|_| len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| SyncError::Protocol(format!("message too large: {len} bytes")))
}

/// Encodes a message into a complete frame.
pub fn encode_frame(message: &ReplicationMessage) -> SyncResult<Vec<u8>> {
    let body = serde_json::to_vec(message)?;
    let len = check_len(body.len())?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + body.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes a frame body (without the length prefix).
pub fn decode_body(body: &[u8]) -> SyncResult<ReplicationMessage> {
    Ok(serde_json::from_slice(body)?)
}

/// Reads one frame.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame. A
/// stream that ends inside a frame is an `UnexpectedEof` I/O error.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> SyncResult<Option<ReplicationMessage>> {
    let mut prefix = [0u8; PREFIX_LEN];
    let mut filled = 0;
    while filled < PREFIX_LEN {
        match reader.read(&mut prefix[filled..]).await? {
            0 if filled == 0 => return Ok(None),
            0 => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            n => filled += n,
        }
    }

    let len = u32::from_be_bytes(prefix) as usize;
    check_len(len)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    decode_body(&body).map(Some)
}

/// Writes one frame and flushes.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &ReplicationMessage,
) -> SyncResult<()> {
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
