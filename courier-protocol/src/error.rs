//! Protocol error types and wire error codes.

use std::fmt;
use thiserror::Error;

/// Errors raised while framing or (de)serializing packets.
///
/// Every variant is fatal for the connection it occurs on: the byte stream
/// carries no resynchronization marker.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("malformed packet: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("failed to encode packet: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error codes carried in the `Error` payload.
///
/// The numeric values are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    VersionMismatch = 1001,
    UnknownMessageType = 3001,
    InternalError = 3002,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Maps a wire value back to a known code.
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            1001 => Some(ErrorCode::VersionMismatch),
            3001 => Some(ErrorCode::UnknownMessageType),
            3002 => Some(ErrorCode::InternalError),
            _ => None,
        }
    }

    /// Returns true if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::InternalError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::VersionMismatch => "VERSION_MISMATCH",
            ErrorCode::UnknownMessageType => "UNKNOWN_MESSAGE_TYPE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}
