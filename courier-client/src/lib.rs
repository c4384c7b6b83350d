//! # courier-client
//!
//! Client library for courier.
//!
//! This crate provides:
//! - `Connection`: one framed TCP connection with strictly sequential
//!   request/response and per-request timeouts
//! - `Client`: echo, register and login helpers

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
