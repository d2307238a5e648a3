//! Browser native-messaging framing: every message is a 32-bit length in
//! native byte order followed by that many bytes of UTF-8 JSON.
use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame the browser will send to a native host.
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;
/// Largest frame a native host may send to the browser.
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Reads one raw frame. Returns `Ok(None)` when the stream closes cleanly
/// between frames; a stream that closes inside a header is an error.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let read = reader.read(&mut header[filled..]).await?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(CodecError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream closed after {filled} of 4 header bytes"),
            )));
        }
        filled += read;
    }
    let len = u32::from_ne_bytes(header) as usize;
    if len > max_len {
        return Err(CodecError::FrameTooLarge { len, max: max_len });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub fn decode_message<T: DeserializeOwned>(frame: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(frame)?)
}

pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_OUTBOUND_FRAME {
        return Err(CodecError::FrameTooLarge {
            len: body.len(),
            max: MAX_OUTBOUND_FRAME,
        });
    }
    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
