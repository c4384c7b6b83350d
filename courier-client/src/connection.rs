//! Connection management.

use crate::error::ClientError;
use bytes::Bytes;
use courier_protocol::{
    Encoder, FrameCodec, Packet, PacketCodec, Payload, ProstCodec, DEFAULT_PORT, MAX_FRAME_SIZE,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Time allowed for one request/response exchange.
    pub request_timeout: Duration,
    /// Largest accepted response frame.
    pub max_frame_bytes: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))
    }
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            // responses may be slightly larger than the largest request
            max_frame_bytes: MAX_FRAME_SIZE.saturating_mul(2),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_frame_bytes(mut self, max: u32) -> Self {
        self.max_frame_bytes = max;
        self
    }
}

/// A connection to a courier server.
///
/// Requests are strictly sequential: the stream lock is held from writing a
/// request until its response frame has been read. Any failed exchange
/// (timeout, transport error, out-of-order reply) drops the stream, since a
/// late reply would otherwise answer the next request. Call
/// [`connect`](Self::connect) again to resume.
pub struct Connection {
    config: ConnectionConfig,
    stream: Mutex<Option<TcpStream>>,
    encoder: Encoder,
    codec: ProstCodec,
    frames: FrameCodec,
    next_sequence: AtomicU32,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let frames = FrameCodec::with_max_payload(config.max_frame_bytes);
        Self {
            config,
            stream: Mutex::new(None),
            encoder: Encoder::new(),
            codec: ProstCodec,
            frames,
            next_sequence: AtomicU32::new(1),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let tcp_stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        tcp_stream.set_nodelay(true).ok();

        *self.stream.lock().await = Some(tcp_stream);
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("Connected to {}", self.config.addr);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut stream) = self.stream.lock().await.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }

    /// Returns the sequence number the next request will use.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence.load(Ordering::SeqCst)
    }

    /// Sends a payload with a fresh sequence number and waits for the reply.
    pub async fn request(&self, payload: Payload) -> Result<Packet, ClientError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let response = self.send_packet(Packet::new(sequence, payload)).await?;
        if response.sequence != sequence {
            tracing::warn!(
                "Reply sequence {} does not match request {}, dropping connection",
                response.sequence,
                sequence
            );
            self.disconnect(&mut *self.stream.lock().await);
            return Err(ClientError::SequenceMismatch {
                sent: sequence,
                received: response.sequence,
            });
        }
        Ok(response)
    }

    /// Sends a fully formed packet as-is and returns the next response.
    pub async fn send_packet(&self, packet: Packet) -> Result<Packet, ClientError> {
        let encoded = self.encoder.encode_packet(&packet)?;
        tracing::debug!(
            "Sending {} (seq={}, {} bytes)",
            packet.kind(),
            packet.sequence,
            encoded.len()
        );

        let frame = self
            .exchange(&encoded)
            .await?
            .ok_or(ClientError::ConnectionClosed)?;
        let response = self.codec.decode(&frame)?;
        tracing::debug!("Received {} (seq={})", response.kind(), response.sequence);
        Ok(response)
    }

    /// Writes raw bytes and returns the next frame payload, or `None` if the
    /// server closed the connection instead of answering.
    pub async fn send_raw(&self, bytes: &[u8]) -> Result<Option<Bytes>, ClientError> {
        self.exchange(bytes).await
    }

    async fn exchange(&self, bytes: &[u8]) -> Result<Option<Bytes>, ClientError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let round_trip = async {
            stream.write_all(bytes).await?;
            let frame = self.frames.decode_next(stream).await?;
            Ok::<_, ClientError>(frame)
        };
        let result = tokio::time::timeout(self.config.request_timeout, round_trip)
            .await
            .unwrap_or(Err(ClientError::Timeout));

        match result {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                tracing::debug!("Server closed the connection");
                self.disconnect(&mut guard);
                Ok(None)
            }
            Err(e) => {
                tracing::debug!("Exchange failed: {}", e);
                self.disconnect(&mut guard);
                Err(e)
            }
        }
    }

    fn disconnect(&self, stream: &mut Option<TcpStream>) {
        stream.take();
        self.connected.store(false, Ordering::SeqCst);
    }
}
