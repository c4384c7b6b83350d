//! Packet codec plus buffered encoder and decoder.
//!
//! [`PacketCodec`] is the seam between the framing layer and the schema: the
//! server and client only ever see `encode(Packet) -> bytes` and
//! `decode(bytes) -> Packet`.

use crate::error::ProtocolError;
use crate::frame::FrameCodec;
use crate::message::Packet;
use bytes::{Bytes, BytesMut};
use prost::Message;
use std::sync::Arc;

/// Serializes packets to and from raw frame payloads.
pub trait PacketCodec: Send + Sync {
    fn encode(&self, packet: &Packet) -> Result<Bytes, ProtocolError>;

    fn decode(&self, payload: &[u8]) -> Result<Packet, ProtocolError>;
}

/// Protobuf codec backed by prost.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProstCodec;

impl PacketCodec for ProstCodec {
    fn encode(&self, packet: &Packet) -> Result<Bytes, ProtocolError> {
        let mut buf = BytesMut::with_capacity(packet.encoded_len());
        packet.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    fn decode(&self, payload: &[u8]) -> Result<Packet, ProtocolError> {
        Ok(<Packet as Message>::decode(payload)?)
    }
}

/// Encodes packets into complete frames.
#[derive(Clone)]
pub struct Encoder {
    codec: Arc<dyn PacketCodec>,
    frames: FrameCodec,
}

impl Encoder {
    /// Creates a protobuf encoder with unbounded frames.
    pub fn new() -> Self {
        Self::with_codec(Arc::new(ProstCodec), FrameCodec::new())
    }

    pub fn with_codec(codec: Arc<dyn PacketCodec>, frames: FrameCodec) -> Self {
        Self { codec, frames }
    }

    /// Encodes a packet into a length-prefixed frame.
    pub fn encode_packet(&self, packet: &Packet) -> Result<BytesMut, ProtocolError> {
        let payload = self.codec.encode(packet)?;
        self.frames.encode(&payload)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates raw bytes and yields decoded packets.
pub struct Decoder {
    buffer: BytesMut,
    codec: Arc<dyn PacketCodec>,
    frames: FrameCodec,
}

impl Decoder {
    /// Creates a protobuf decoder with unbounded frames.
    pub fn new() -> Self {
        Self::with_codec(Arc::new(ProstCodec), FrameCodec::new())
    }

    pub fn with_codec(codec: Arc<dyn PacketCodec>, frames: FrameCodec) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            codec,
            frames,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to split the next raw frame payload off the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        self.frames.decode(&mut self.buffer)
    }

    /// Attempts to decode the next packet from the buffer.
    pub fn decode_packet(&mut self) -> Result<Option<Packet>, ProtocolError> {
        match self.decode_frame()? {
            Some(payload) => Ok(Some(self.codec.decode(&payload)?)),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
