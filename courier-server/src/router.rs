//! Packet dispatch.

use crate::handler::{AccountHandler, EchoHandler};
use courier_accounts::UserService;
use courier_protocol::{ErrorCode, Packet, Payload, PROTOCOL_VERSION};
use std::sync::Arc;

/// Validates the protocol version and routes each packet to its handler.
///
/// Stateless apart from the shared account service, so one router serves
/// every connection.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    echo: EchoHandler,
    accounts: AccountHandler,
}

impl MessageRouter {
    pub fn new(service: Arc<UserService>) -> Self {
        Self {
            echo: EchoHandler,
            accounts: AccountHandler::new(service),
        }
    }

    pub fn accounts(&self) -> &AccountHandler {
        &self.accounts
    }

    /// Produces exactly one response for a request. The response carries the
    /// request's sequence number and the supported protocol version.
    pub fn dispatch(&self, packet: Packet) -> Packet {
        let sequence = packet.sequence;

        if packet.version != PROTOCOL_VERSION {
            tracing::warn!(
                "Rejecting packet seq={} with protocol version {}",
                sequence,
                packet.version
            );
            return Packet::error(
                sequence,
                ErrorCode::VersionMismatch,
                format!(
                    "unsupported protocol version {} (expected {})",
                    packet.version, PROTOCOL_VERSION
                ),
            );
        }

        let payload = match packet.payload {
            Some(Payload::EchoRequest(request)) => {
                Payload::EchoResponse(self.echo.handle(request))
            }
            Some(Payload::RegisterRequest(request)) => {
                Payload::RegisterResponse(self.accounts.register(&request))
            }
            Some(Payload::LoginRequest(request)) => {
                Payload::LoginResponse(self.accounts.login(&request))
            }
            Some(
                other @ (Payload::EchoResponse(_)
                | Payload::RegisterResponse(_)
                | Payload::LoginResponse(_)
                | Payload::Error(_)),
            ) => {
                tracing::warn!("Unsupported message type {} (seq={})", other.kind(), sequence);
                return Packet::error(
                    sequence,
                    ErrorCode::UnknownMessageType,
                    format!("unsupported message type: {}", other.kind()),
                );
            }
            None => {
                tracing::warn!("Packet seq={} has no payload", sequence);
                return Packet::error(
                    sequence,
                    ErrorCode::UnknownMessageType,
                    "unknown message type: packet has no payload",
                );
            }
        };

        Packet::new(sequence, payload)
    }

    /// Async entry point for connection tasks.
    ///
    /// Register and login hash passwords, which can take tens of
    /// milliseconds, so those run on the blocking pool. Everything else is
    /// answered inline.
    pub async fn route(&self, packet: Packet) -> Packet {
        let hashes_password = packet.version == PROTOCOL_VERSION
            && matches!(
                packet.payload,
                Some(Payload::RegisterRequest(_) | Payload::LoginRequest(_))
            );
        if !hashes_password {
            return self.dispatch(packet);
        }

        let sequence = packet.sequence;
        let router = self.clone();
        match tokio::task::spawn_blocking(move || router.dispatch(packet)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Account handler for seq={} failed: {}", sequence, e);
                Packet::error(
                    sequence,
                    ErrorCode::InternalError,
                    "internal error: request handler failed",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_accounts::{AccountPolicy, UserStore, MIN_COST};
    use courier_protocol::{EchoResponse, MessageKind, RegisterResponse};

    fn router() -> MessageRouter {
        let service = UserService::with_policy(
            Arc::new(UserStore::new()),
            AccountPolicy {
                hash_cost: MIN_COST,
                ..AccountPolicy::default()
            },
        );
        MessageRouter::new(Arc::new(service))
    }

    fn error_code(packet: &Packet) -> Option<ErrorCode> {
        match &packet.payload {
            Some(Payload::Error(err)) => err.code(),
            _ => None,
        }
    }

    #[test]
    fn test_echo_dispatch() {
        let response = router().dispatch(Packet::echo_request(11, "ping"));
        assert_eq!(response.sequence, 11);
        assert_eq!(response.version, PROTOCOL_VERSION);
        assert_eq!(
            response.payload,
            Some(Payload::EchoResponse(EchoResponse {
                content: b"ping".to_vec()
            }))
        );
    }

    #[test]
    fn test_version_mismatch_skips_handlers() {
        let router = router();
        let request = Packet::register_request(4, "alice", "pw").with_version(2);
        let response = router.dispatch(request);

        assert_eq!(response.sequence, 4);
        assert_eq!(response.version, PROTOCOL_VERSION);
        assert_eq!(error_code(&response), Some(ErrorCode::VersionMismatch));
        assert!(router.accounts().service().store().is_empty());
    }

    #[test]
    fn test_version_zero_rejected() {
        let response = router().dispatch(Packet::echo_request(1, "x").with_version(0));
        assert_eq!(error_code(&response), Some(ErrorCode::VersionMismatch));
    }

    #[test]
    fn test_missing_payload() {
        let response = router().dispatch(Packet::empty(99));
        assert_eq!(response.sequence, 99);
        assert_eq!(error_code(&response), Some(ErrorCode::UnknownMessageType));
    }

    #[test]
    fn test_response_kinds_are_not_requests() {
        let router = router();
        let inbound = [
            Payload::EchoResponse(EchoResponse::default()),
            Payload::RegisterResponse(RegisterResponse::default()),
            Payload::Error(Default::default()),
        ];
        for payload in inbound {
            let response = router.dispatch(Packet::new(5, payload));
            assert_eq!(error_code(&response), Some(ErrorCode::UnknownMessageType));
        }
    }

    #[test]
    fn test_account_dispatch() {
        let router = router();
        let registered = router.dispatch(Packet::register_request(1, "carol", "pw"));
        assert_eq!(registered.kind(), MessageKind::RegisterResponse);

        let login = router.dispatch(Packet::login_request(2, "carol", "pw"));
        assert_eq!(login.sequence, 2);
        match login.payload {
            Some(Payload::LoginResponse(r)) => {
                assert!(r.success);
                assert_eq!(r.username, "carol");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_route_hashes_off_the_runtime_thread() {
        // slow enough that an inline hash would finish during the yields below
        let service = UserService::with_policy(
            Arc::new(UserStore::new()),
            AccountPolicy {
                hash_cost: 10,
                ..AccountPolicy::default()
            },
        );
        let router = MessageRouter::new(Arc::new(service));
        router.dispatch(Packet::register_request(1, "dave", "pw"));

        let login = tokio::spawn({
            let router = router.clone();
            async move { router.route(Packet::login_request(2, "dave", "pw")).await }
        });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        // the single runtime thread is still free to answer other packets
        let echo = router.route(Packet::echo_request(3, "x")).await;
        assert_eq!(echo.kind(), MessageKind::EchoResponse);
        assert!(!login.is_finished());

        let login = login.await.unwrap();
        assert_eq!(login.sequence, 2);
        assert!(matches!(
            login.payload,
            Some(Payload::LoginResponse(ref r)) if r.success
        ));
    }

    #[tokio::test]
    async fn test_route_matches_dispatch() {
        let router = router();
        let register = router
            .route(Packet::register_request(1, "erin", "pw"))
            .await;
        assert_eq!(register.kind(), MessageKind::RegisterResponse);

        // version gating happens before anything reaches the blocking pool
        let stale = router
            .route(Packet::login_request(2, "erin", "pw").with_version(9))
            .await;
        assert_eq!(error_code(&stale), Some(ErrorCode::VersionMismatch));

        let echo = router.route(Packet::echo_request(3, "hi")).await;
        assert_eq!(
            echo.payload,
            Some(Payload::EchoResponse(EchoResponse {
                content: b"hi".to_vec()
            }))
        );
    }
}
