//! Server error types.

use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// Server errors. Inside a connection worker every variant ends the
/// connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] courier_protocol::ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("connection idle for {0:?}")]
    IdleTimeout(Duration),

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Returns true if the peer broke the wire protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ServerError::Protocol(_))
    }
}
