//! # courier-server
//!
//! TCP server for courier.
//!
//! This crate provides:
//! - TCP connection handling with one worker task per connection
//! - Protocol version gating and payload dispatch
//! - Echo and account request handlers
//! - Session tracking and server statistics
//! - YAML + environment configuration

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod session;

pub use config::{AccountsConfig, Config, ConfigError, LoggingConfig, NetworkConfig};
pub use error::ServerError;
pub use handler::{AccountHandler, EchoHandler};
pub use router::MessageRouter;
pub use server::{Server, ServerConfig, ServerStats};
pub use session::{AuthenticatedUser, Session, SessionInfo, SessionRegistry};
