//! # courier-accounts
//!
//! User account state for the courier server.
//!
//! This crate provides:
//! - `UserStore`: the in-memory user table with atomic check-and-insert
//! - `UserService`: registration and login rules on top of the store
//! - bcrypt password hashing

pub mod error;
pub mod password;
pub mod service;
pub mod store;

pub use error::AccountError;
pub use password::{hash_password, verify_password, DEFAULT_COST, MAX_COST, MIN_COST};
pub use service::{AccountPolicy, UserService, MIN_USERNAME_LEN};
pub use store::{User, UserStore};
