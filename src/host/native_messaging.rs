//! Native messaging framing. Every message is UTF-8 JSON preceded by its length as a 32-bit
//! unsigned integer in native byte order.

use std::io::ErrorKind;

use anyhow::{bail, Context, Result};
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Browsers refuse messages to the extension above this size.
pub const MAX_OUTBOUND_SIZE: usize = 1024 * 1024;

/// Nothing the extension sends comes close to this.
pub const MAX_INBOUND_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    Message(Vec<u8>),
    /// The payload was larger than [MAX_INBOUND_SIZE] and was discarded.
    Oversized(usize),
}

/// Reads the next frame. Returns `None` once the browser closed the pipe between two messages.
pub async fn read_message(reader: &mut (impl AsyncRead + Unpin)) -> Result<Option<Frame>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => (),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let length = u32::from_ne_bytes(header) as usize;
    if length > MAX_INBOUND_SIZE {
        // Skipping the payload keeps the stream aligned on the next header.
        let skipped = io::copy(&mut (&mut *reader).take(length as u64), &mut io::sink()).await?;
        if skipped < length as u64 {
            bail!("Pipe closed inside a {length} byte message");
        }
        return Ok(Some(Frame::Oversized(length)));
    }

    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .await
        .with_context(|| format!("Pipe closed inside a {length} byte message"))?;
    Ok(Some(Frame::Message(body)))
}

pub async fn write_message(writer: &mut (impl AsyncWrite + Unpin), message: &[u8]) -> Result<()> {
    if message.len() > MAX_OUTBOUND_SIZE {
        bail!(
            "Message of {} bytes exceeds the {MAX_OUTBOUND_SIZE} byte limit",
            message.len()
        );
    }
    let length = message.len() as u32;
    writer.write_all(&length.to_ne_bytes()).await?;
    writer.write_all(message).await?;
    writer.flush().await?;
    Ok(())
}
