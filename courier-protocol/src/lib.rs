//! # courier-protocol
//!
//! Wire protocol for the courier packet server.
//!
//! This crate provides:
//! - Length-prefixed framing (4-byte big-endian length, no magic, no checksum)
//! - Protobuf packet schema with a single `oneof` payload
//! - A pluggable packet codec and buffered encoder/decoder
//! - Error codes and protocol constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoder, Encoder, PacketCodec, ProstCodec};
pub use error::{ErrorCode, ProtocolError};
pub use frame::{FrameCodec, LENGTH_PREFIX_SIZE};
pub use message::{
    EchoRequest, EchoResponse, ErrorResponse, LoginRequest, LoginResponse, MessageKind, Packet,
    Payload, RegisterRequest, RegisterResponse,
};

/// Protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default port for the courier server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default maximum inbound frame payload (1 MiB).
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;
