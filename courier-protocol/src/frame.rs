//! Length-prefixed wire framing.
//!
//! ```text
//! +----------------+---------------------------+
//! | length (u32 BE)| payload (length bytes)    |
//! +----------------+---------------------------+
//! ```
//!
//! There is no magic number and no checksum. The length counts payload bytes
//! only, so an empty payload is the four bytes `00 00 00 00`.

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Encodes and decodes length-prefixed frames.
///
/// The codec holds no stream state. An optional payload limit rejects
/// oversize declared lengths before any payload bytes are buffered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCodec {
    max_payload: Option<u32>,
}

impl FrameCodec {
    /// Creates a codec without a payload limit.
    pub fn new() -> Self {
        Self { max_payload: None }
    }

    /// Creates a codec that rejects payloads larger than `max` bytes.
    pub fn with_max_payload(max: u32) -> Self {
        Self {
            max_payload: Some(max),
        }
    }

    pub fn max_payload(&self) -> Option<u32> {
        self.max_payload
    }

    /// Frames a payload.
    pub fn encode(&self, payload: &[u8]) -> Result<BytesMut, ProtocolError> {
        let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::FrameTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        })?;
        self.check_len(len)?;

        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
        buf.put_u32(len);
        buf.put_slice(payload);
        Ok(buf)
    }

    /// Extracts one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched when more bytes are
    /// needed.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        self.check_len(len)?;

        let total = LENGTH_PREFIX_SIZE + len as usize;
        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }

        buf.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(buf.split_to(len as usize).freeze()))
    }

    /// Reads the next frame from an async reader.
    ///
    /// Returns `Ok(None)` if the stream ends before a complete frame, which
    /// callers treat as a peer disconnect rather than an error.
    pub async fn decode_next<R>(&self, reader: &mut R) -> Result<Option<Bytes>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        if !read_full(reader, &mut prefix).await? {
            return Ok(None);
        }

        let len = u32::from_be_bytes(prefix);
        self.check_len(len)?;

        let mut payload = vec![0u8; len as usize];
        if !read_full(reader, &mut payload).await? {
            return Ok(None);
        }
        Ok(Some(Bytes::from(payload)))
    }

    fn check_len(&self, len: u32) -> Result<(), ProtocolError> {
        match self.max_payload {
            Some(max) if len > max => Err(ProtocolError::FrameTooLarge {
                size: len as usize,
                max: max as usize,
            }),
            _ => Ok(()),
        }
    }
}

/// Fills `buf` completely, returning false on a clean or mid-buffer EOF.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}
