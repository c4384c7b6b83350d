//! TCP server implementation.

use crate::config::{Config, NetworkConfig};
use crate::error::ServerError;
use crate::router::MessageRouter;
use crate::session::{AuthenticatedUser, Session, SessionRegistry};
use courier_accounts::{UserService, UserStore};
use courier_protocol::{
    Decoder, Encoder, FrameCodec, PacketCodec, Payload, ProstCodec, DEFAULT_PORT, MAX_FRAME_SIZE,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

const READ_BUFFER_SIZE: usize = 8192;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Largest accepted inbound frame payload.
    pub max_frame_bytes: u32,
    /// Drop connections that send nothing for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_connections: 1000,
            max_frame_bytes: MAX_FRAME_SIZE,
            idle_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn from_network(network: &NetworkConfig) -> Self {
        Self {
            bind_addr: network.bind_addr,
            max_connections: network.max_connections,
            max_frame_bytes: network.max_frame_bytes,
            idle_timeout: network.idle_timeout(),
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_max_frame_bytes(mut self, max: u32) -> Self {
        self.max_frame_bytes = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub requests_total: AtomicU64,
    /// Requests answered with an `Error` payload.
    pub protocol_errors: AtomicU64,
    /// Connections closed by a transport or framing failure.
    pub connection_errors: AtomicU64,
}

impl ServerStats {
    pub fn summary(&self) -> String {
        format!(
            "connections={} rejected={} requests={} protocol_errors={} connection_errors={}",
            self.connections_total.load(Ordering::Relaxed),
            self.connections_rejected.load(Ordering::Relaxed),
            self.requests_total.load(Ordering::Relaxed),
            self.protocol_errors.load(Ordering::Relaxed),
            self.connection_errors.load(Ordering::Relaxed),
        )
    }
}

/// Everything a connection worker shares with the server.
#[derive(Clone)]
struct ConnectionContext {
    router: Arc<MessageRouter>,
    codec: Arc<dyn PacketCodec>,
    sessions: Arc<SessionRegistry>,
    stats: Arc<ServerStats>,
    config: ServerConfig,
}

/// TCP server for courier.
pub struct Server {
    config: ServerConfig,
    router: Arc<MessageRouter>,
    codec: Arc<dyn PacketCodec>,
    sessions: Arc<SessionRegistry>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server using the protobuf codec.
    pub fn new(config: ServerConfig, service: Arc<UserService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            router: Arc::new(MessageRouter::new(service)),
            codec: Arc::new(ProstCodec),
            sessions: Arc::new(SessionRegistry::new()),
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Builds a server with an empty user store from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;
        let store = Arc::new(UserStore::new());
        let service = UserService::with_policy(store, config.accounts.policy());
        Ok(Self::new(
            ServerConfig::from_network(&config.network),
            Arc::new(service),
        ))
    }

    /// Replaces the packet codec.
    pub fn with_codec(mut self, codec: Arc<dyn PacketCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Server listening on {}", listener.local_addr()?);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => self.accept(tcp_stream, addr),
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down ({})", self.stats.summary());
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn accept(&self, tcp_stream: TcpStream, addr: SocketAddr) {
        if self.sessions.active_count() >= self.config.max_connections {
            tracing::warn!("Connection limit reached, rejecting {}", addr);
            self.stats
                .connections_rejected
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        let mut session = Session::new(addr);
        let active = self.sessions.register(&session);
        tracing::info!(
            "Client connected: {} (session={}, active={})",
            addr,
            session.id(),
            active
        );

        let ctx = self.context();
        let mut conn_shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let result =
                Self::handle_connection(tcp_stream, &mut session, &ctx, &mut conn_shutdown).await;

            match result {
                Ok(()) | Err(ServerError::ShuttingDown) => {}
                Err(e) if e.is_protocol_violation() => {
                    tracing::warn!("[{}] Closing connection: {}", addr, e);
                    ctx.stats.connection_errors.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::debug!("Connection {} error: {}", addr, e);
                    ctx.stats.connection_errors.fetch_add(1, Ordering::Relaxed);
                }
            }

            ctx.sessions.unregister(session.id());
            tracing::info!(
                "Client disconnected: {} ({} requests)",
                addr,
                session.request_count()
            );
        });
    }

    fn context(&self) -> ConnectionContext {
        ConnectionContext {
            router: self.router.clone(),
            codec: self.codec.clone(),
            sessions: self.sessions.clone(),
            stats: self.stats.clone(),
            config: self.config.clone(),
        }
    }

    /// Drives one connection: read, decode, dispatch, respond, strictly in
    /// order. Returns on disconnect; any framing or decode failure is
    /// returned as an error and closes the connection.
    async fn handle_connection(
        mut stream: TcpStream,
        session: &mut Session,
        ctx: &ConnectionContext,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = session.remote_addr();
        let mut decoder = Decoder::with_codec(
            ctx.codec.clone(),
            FrameCodec::with_max_payload(ctx.config.max_frame_bytes),
        );
        // Outbound frames are not capped: an echo of a maximal request is
        // slightly larger than the request.
        let encoder = Encoder::with_codec(ctx.codec.clone(), FrameCodec::new());
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            if decoder.buffered() > 0 {
                                tracing::debug!(
                                    "[{}] Connection closed mid-frame ({} bytes discarded)",
                                    addr,
                                    decoder.buffered()
                                );
                            } else {
                                tracing::debug!("[{}] Connection closed by client", addr);
                            }
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::trace!("[{}] Received {} bytes", addr, n);
                            decoder.extend(&buf[..n]);
                        }
                        Err(e) => {
                            tracing::debug!("[{}] Read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }

                idle = idle_timer(ctx.config.idle_timeout) => {
                    tracing::debug!("[{}] Idle timeout", addr);
                    return Err(ServerError::IdleTimeout(idle));
                }

                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Err(ServerError::ShuttingDown);
                }
            }

            while let Some(request) = decoder.decode_packet()? {
                session.record_request();
                ctx.stats.requests_total.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "[{}] Request: {} (seq={})",
                    addr,
                    request.kind(),
                    request.sequence
                );

                let response = ctx.router.route(request).await;

                if let Some(Payload::LoginResponse(login)) = &response.payload {
                    if login.success {
                        let user = AuthenticatedUser {
                            user_id: login.user_id,
                            username: login.username.clone(),
                        };
                        ctx.sessions.set_user(session.id(), user.clone());
                        session.set_authenticated_user(user);
                    }
                }
                if response.is_error() {
                    ctx.stats.protocol_errors.fetch_add(1, Ordering::Relaxed);
                }

                let response_bytes = encoder.encode_packet(&response)?;
                tracing::debug!(
                    "[{}] Response: {} (seq={}, {} bytes)",
                    addr,
                    response.kind(),
                    response.sequence,
                    response_bytes.len()
                );
                stream.write_all(&response_bytes).await?;
            }
        }
    }

    /// Signals the server and all connection workers to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn user_service(&self) -> &Arc<UserService> {
        self.router.accounts().service()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Completes after `timeout`, or never when no timeout is set.
async fn idle_timer(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}
