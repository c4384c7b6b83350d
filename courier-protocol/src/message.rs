//! Packet schema.
//!
//! The types carry prost derives directly, so no `.proto` build step is
//! involved. Field tags match the published schema:
//!
//! ```text
//! message Packet {
//!   uint32 version = 1;
//!   uint32 sequence = 2;
//!   oneof payload {
//!     EchoRequest echo_request = 3;
//!     EchoResponse echo_response = 4;
//!     RegisterRequest register_request = 5;
//!     RegisterResponse register_response = 6;
//!     LoginRequest login_request = 7;
//!     LoginResponse login_response = 8;
//!     Error error = 9;
//!   }
//! }
//! ```

use crate::error::ErrorCode;
use crate::PROTOCOL_VERSION;
use std::fmt;

/// Envelope for every message on the wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Packet {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(uint32, tag = "2")]
    pub sequence: u32,
    #[prost(oneof = "Payload", tags = "3, 4, 5, 6, 7, 8, 9")]
    pub payload: Option<Payload>,
}

/// The single populated message inside a [`Packet`].
#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum Payload {
    #[prost(message, tag = "3")]
    EchoRequest(EchoRequest),
    #[prost(message, tag = "4")]
    EchoResponse(EchoResponse),
    #[prost(message, tag = "5")]
    RegisterRequest(RegisterRequest),
    #[prost(message, tag = "6")]
    RegisterResponse(RegisterResponse),
    #[prost(message, tag = "7")]
    LoginRequest(LoginRequest),
    #[prost(message, tag = "8")]
    LoginResponse(LoginResponse),
    #[prost(message, tag = "9")]
    Error(ErrorResponse),
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EchoRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub content: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EchoResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub content: Vec<u8>,
}

/// Registration request. The password travels in cleartext and is redacted
/// from `Debug` output.
#[derive(Clone, PartialEq, ::prost::Message)]
#[prost(skip_debug)]
pub struct RegisterRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    /// Only meaningful when `success` is true.
    #[prost(uint64, tag = "3")]
    pub user_id: u64,
}

/// Login request. Redacted from `Debug` output like [`RegisterRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
#[prost(skip_debug)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(uint64, tag = "3")]
    pub user_id: u64,
    #[prost(string, tag = "4")]
    pub username: String,
}

/// Protocol-level error reply (the `error` payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(uint32, tag = "1")]
    pub error_code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ErrorResponse {
    /// Returns the error code if it is one this build knows.
    pub fn code(&self) -> Option<ErrorCode> {
        ErrorCode::from_u32(self.error_code)
    }
}

/// Payload discriminant, used for logging and dispatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    EchoRequest,
    EchoResponse,
    RegisterRequest,
    RegisterResponse,
    LoginRequest,
    LoginResponse,
    Error,
    /// No payload set.
    Empty,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::EchoRequest => "ECHO_REQUEST",
            MessageKind::EchoResponse => "ECHO_RESPONSE",
            MessageKind::RegisterRequest => "REGISTER_REQUEST",
            MessageKind::RegisterResponse => "REGISTER_RESPONSE",
            MessageKind::LoginRequest => "LOGIN_REQUEST",
            MessageKind::LoginResponse => "LOGIN_RESPONSE",
            MessageKind::Error => "ERROR",
            MessageKind::Empty => "EMPTY",
        }
    }

    /// Returns true for kinds a client may send.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            MessageKind::EchoRequest | MessageKind::RegisterRequest | MessageKind::LoginRequest
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::EchoRequest(_) => MessageKind::EchoRequest,
            Payload::EchoResponse(_) => MessageKind::EchoResponse,
            Payload::RegisterRequest(_) => MessageKind::RegisterRequest,
            Payload::RegisterResponse(_) => MessageKind::RegisterResponse,
            Payload::LoginRequest(_) => MessageKind::LoginRequest,
            Payload::LoginResponse(_) => MessageKind::LoginResponse,
            Payload::Error(_) => MessageKind::Error,
        }
    }
}

impl Packet {
    /// Creates a packet at the current protocol version.
    pub fn new(sequence: u32, payload: Payload) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sequence,
            payload: Some(payload),
        }
    }

    /// Creates a packet with no payload.
    pub fn empty(sequence: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            sequence,
            payload: None,
        }
    }

    /// Overrides the protocol version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn echo_request(sequence: u32, content: impl Into<Vec<u8>>) -> Self {
        Self::new(
            sequence,
            Payload::EchoRequest(EchoRequest {
                content: content.into(),
            }),
        )
    }

    pub fn register_request(
        sequence: u32,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(
            sequence,
            Payload::RegisterRequest(RegisterRequest {
                username: username.into(),
                password: password.into(),
            }),
        )
    }

    pub fn login_request(
        sequence: u32,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(
            sequence,
            Payload::LoginRequest(LoginRequest {
                username: username.into(),
                password: password.into(),
            }),
        )
    }

    pub fn error(sequence: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            sequence,
            Payload::Error(ErrorResponse {
                error_code: code.as_u32(),
                message: message.into(),
            }),
        )
    }

    pub fn kind(&self) -> MessageKind {
        self.payload
            .as_ref()
            .map(Payload::kind)
            .unwrap_or(MessageKind::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, Some(Payload::Error(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_packet_constructors() {
        let packet = Packet::echo_request(7, "hi");
        assert_eq!(packet.version, PROTOCOL_VERSION);
        assert_eq!(packet.sequence, 7);
        assert_eq!(packet.kind(), MessageKind::EchoRequest);

        let packet = Packet::empty(3).with_version(2);
        assert_eq!(packet.version, 2);
        assert_eq!(packet.kind(), MessageKind::Empty);
        assert!(!packet.is_error());

        let packet = Packet::error(1, ErrorCode::VersionMismatch, "bad version");
        assert!(packet.is_error());
        match packet.payload {
            Some(Payload::Error(err)) => {
                assert_eq!(err.error_code, 1001);
                assert_eq!(err.code(), Some(ErrorCode::VersionMismatch));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_field_tags_on_the_wire() {
        // version=1 (tag 1), sequence=5 (tag 2), echo_request (tag 3) { content "ab" }
        let bytes = Packet::echo_request(5, "ab").encode_to_vec();
        assert_eq!(
            bytes,
            vec![0x08, 0x01, 0x10, 0x05, 0x1a, 0x04, 0x0a, 0x02, b'a', b'b']
        );
    }

    #[test]
    fn test_error_payload_tag() {
        let bytes = Packet::error(0, ErrorCode::UnknownMessageType, "").encode_to_vec();
        // error payload is field 9, wire type 2
        assert_eq!(bytes[2], (9 << 3) | 2);
    }

    #[test]
    fn test_empty_packet_decodes_without_payload() {
        let packet = Packet::decode(&[0u8; 0][..]).unwrap();
        assert_eq!(packet.version, 0);
        assert_eq!(packet.sequence, 0);
        assert!(packet.payload.is_none());
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let packet = Packet::login_request(1, "alice", "hunter22");
        let rendered = format!("{:?}", packet);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter22"));

        let packet = Packet::register_request(1, "bob", "s3cret!!");
        assert!(!format!("{:?}", packet).contains("s3cret!!"));
    }

    #[test]
    fn test_message_kind_is_request() {
        assert!(MessageKind::EchoRequest.is_request());
        assert!(MessageKind::LoginRequest.is_request());
        assert!(!MessageKind::EchoResponse.is_request());
        assert!(!MessageKind::Error.is_request());
        assert!(!MessageKind::Empty.is_request());
        assert_eq!(MessageKind::RegisterResponse.to_string(), "REGISTER_RESPONSE");
    }
}
