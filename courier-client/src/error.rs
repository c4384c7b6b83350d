//! Client error types.

use courier_protocol::{ErrorCode, MessageKind};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] courier_protocol::ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("server error {code}: {message}")]
    Server { code: u32, message: String },

    #[error("unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: MessageKind,
        actual: MessageKind,
    },

    #[error("sequence mismatch: sent {sent}, received {received}")]
    SequenceMismatch { sent: u32, received: u32 },
}

impl ClientError {
    /// Returns the known error code of a server error reply.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Server { code, .. } => ErrorCode::from_u32(*code),
            _ => None,
        }
    }

    /// Returns whether this error is retryable. Transport failures leave the
    /// connection closed, so retrying them needs a reconnect first.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Io(_) | ClientError::Timeout | ClientError::ConnectionClosed => true,
            ClientError::Server { .. } => self.error_code().is_some_and(|c| c.is_retryable()),
            _ => false,
        }
    }
}
