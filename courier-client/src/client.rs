//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use courier_protocol::{
    EchoRequest, LoginRequest, LoginResponse, MessageKind, Packet, Payload, RegisterRequest,
    RegisterResponse,
};
use std::sync::Arc;

/// High-level client for courier.
///
/// Business rejections (duplicate username, wrong password, ...) come back
/// as `Ok` responses with `success == false`. Only protocol-level `Error`
/// replies become [`ClientError::Server`].
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Sends bytes and returns the echoed bytes.
    pub async fn echo(&self, content: impl Into<Vec<u8>>) -> Result<Vec<u8>, ClientError> {
        let payload = Payload::EchoRequest(EchoRequest {
            content: content.into(),
        });
        match self.request(payload, MessageKind::EchoResponse).await? {
            Payload::EchoResponse(response) => Ok(response.content),
            other => Err(unexpected(MessageKind::EchoResponse, &other)),
        }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisterResponse, ClientError> {
        let payload = Payload::RegisterRequest(RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        match self.request(payload, MessageKind::RegisterResponse).await? {
            Payload::RegisterResponse(response) => Ok(response),
            other => Err(unexpected(MessageKind::RegisterResponse, &other)),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let payload = Payload::LoginRequest(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        match self.request(payload, MessageKind::LoginResponse).await? {
            Payload::LoginResponse(response) => Ok(response),
            other => Err(unexpected(MessageKind::LoginResponse, &other)),
        }
    }

    /// Sends a packet verbatim, for diagnostics.
    pub async fn send_packet(&self, packet: Packet) -> Result<Packet, ClientError> {
        self.conn.send_packet(packet).await
    }

    async fn request(
        &self,
        payload: Payload,
        expected: MessageKind,
    ) -> Result<Payload, ClientError> {
        let response = self.conn.request(payload).await?;
        match response.payload {
            Some(Payload::Error(err)) => Err(ClientError::Server {
                code: err.error_code,
                message: err.message,
            }),
            Some(payload) => Ok(payload),
            None => Err(ClientError::UnexpectedResponse {
                expected,
                actual: MessageKind::Empty,
            }),
        }
    }
}

fn unexpected(expected: MessageKind, actual: &Payload) -> ClientError {
    ClientError::UnexpectedResponse {
        expected,
        actual: actual.kind(),
    }
}
