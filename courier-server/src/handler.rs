//! Request handlers.
//!
//! Handlers turn one request payload into one response payload. They never
//! fail: business rejections become `success = false` responses carrying the
//! account error's text.

use courier_accounts::{AccountError, UserService};
use courier_protocol::{
    EchoRequest, EchoResponse, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};
use std::sync::Arc;

pub const REGISTER_SUCCESS: &str = "User registered successfully";
pub const LOGIN_SUCCESS: &str = "Login successful";

/// Returns request content unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl EchoHandler {
    pub fn handle(&self, request: EchoRequest) -> EchoResponse {
        EchoResponse {
            content: request.content,
        }
    }
}

/// Maps registration and login onto [`UserService`].
#[derive(Debug, Clone)]
pub struct AccountHandler {
    service: Arc<UserService>,
}

impl AccountHandler {
    pub fn new(service: Arc<UserService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<UserService> {
        &self.service
    }

    pub fn register(&self, request: &RegisterRequest) -> RegisterResponse {
        match self
            .service
            .register(&request.username, &request.password)
        {
            Ok(user) => RegisterResponse {
                success: true,
                message: REGISTER_SUCCESS.to_string(),
                user_id: user.user_id,
            },
            Err(e) => {
                log_rejection("Registration", &request.username, &e);
                RegisterResponse {
                    success: false,
                    message: e.to_string(),
                    user_id: 0,
                }
            }
        }
    }

    pub fn login(&self, request: &LoginRequest) -> LoginResponse {
        match self.service.login(&request.username, &request.password) {
            Ok(user) => LoginResponse {
                success: true,
                message: LOGIN_SUCCESS.to_string(),
                user_id: user.user_id,
                username: user.username.clone(),
            },
            Err(e) => {
                log_rejection("Login", &request.username, &e);
                LoginResponse {
                    success: false,
                    message: e.to_string(),
                    user_id: 0,
                    username: String::new(),
                }
            }
        }
    }
}

fn log_rejection(action: &str, username: &str, error: &AccountError) {
    if error.is_internal() {
        tracing::error!("{} failed for '{}': {}", action, username, error);
    } else if error.is_validation() {
        tracing::debug!("{} rejected for '{}': {}", action, username, error);
    } else {
        tracing::info!(
            "{} failed for '{}': {}",
            action,
            username,
            error.error_code()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_accounts::{AccountPolicy, UserStore, MIN_COST};

    fn handler() -> AccountHandler {
        let service = UserService::with_policy(
            Arc::new(UserStore::new()),
            AccountPolicy {
                hash_cost: MIN_COST,
                ..AccountPolicy::default()
            },
        );
        AccountHandler::new(Arc::new(service))
    }

    fn register(u: &str, p: &str) -> RegisterRequest {
        RegisterRequest {
            username: u.into(),
            password: p.into(),
        }
    }

    fn login(u: &str, p: &str) -> LoginRequest {
        LoginRequest {
            username: u.into(),
            password: p.into(),
        }
    }

    #[test]
    fn test_echo_identity() {
        let echo = EchoHandler;
        for content in [
            Vec::new(),
            b"hello".to_vec(),
            "héllo wörld ✓".as_bytes().to_vec(),
            (0u8..=255).collect(),
        ] {
            let response = echo.handle(EchoRequest {
                content: content.clone(),
            });
            assert_eq!(response.content, content);
        }
    }

    #[test]
    fn test_register_success() {
        let handler = handler();
        let response = handler.register(&register("alice", "pw"));
        assert!(response.success);
        assert_eq!(response.message, REGISTER_SUCCESS);
        assert_eq!(response.user_id, 1);
    }

    #[test]
    fn test_register_failures() {
        let handler = handler();
        handler.register(&register("alice", "pw"));

        let dup = handler.register(&register("alice", "other"));
        assert!(!dup.success);
        assert!(dup.message.contains("exists"));
        assert_eq!(dup.user_id, 0);

        let short = handler.register(&register("ab", "pw"));
        assert!(!short.success);
        assert!(short.message.contains("too short"));

        let invalid = handler.register(&register("bad name", "pw"));
        assert!(!invalid.success);
        assert!(invalid.message.contains("invalid username"));
    }

    #[test]
    fn test_login_outcomes() {
        let handler = handler();
        let registered = handler.register(&register("bob", "secret"));

        let ok = handler.login(&login("bob", "secret"));
        assert!(ok.success);
        assert_eq!(ok.message, LOGIN_SUCCESS);
        assert_eq!(ok.user_id, registered.user_id);
        assert_eq!(ok.username, "bob");

        let wrong = handler.login(&login("bob", "nope"));
        assert!(!wrong.success);
        assert!(wrong.message.contains("password"));
        assert!(wrong.username.is_empty());

        let missing = handler.login(&login("nobody", "secret"));
        assert!(!missing.success);
        assert!(missing.message.contains("not found"));
    }
}
