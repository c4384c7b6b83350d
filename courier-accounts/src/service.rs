//! Registration and login rules.

use crate::error::AccountError;
use crate::password::{hash_password, verify_password, DEFAULT_COST};
use crate::store::{User, UserStore};
use std::sync::Arc;

/// Shortest username any policy may allow.
pub const MIN_USERNAME_LEN: usize = 3;

/// Input rules and hashing cost for new accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPolicy {
    pub min_username_len: usize,
    pub max_username_len: usize,
    /// 0 accepts any password, including the empty one.
    pub min_password_len: usize,
    /// bcrypt cost factor.
    pub hash_cost: u32,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            min_username_len: MIN_USERNAME_LEN,
            max_username_len: 50,
            min_password_len: 0,
            hash_cost: DEFAULT_COST,
        }
    }
}

impl AccountPolicy {
    /// Checks length bounds (in characters) and the `[A-Za-z0-9_]` charset.
    pub fn validate_username(&self, username: &str) -> Result<(), AccountError> {
        let len = username.chars().count();
        if len < self.min_username_len {
            return Err(AccountError::UsernameTooShort {
                min: self.min_username_len,
            });
        }
        if len > self.max_username_len {
            return Err(AccountError::UsernameTooLong {
                max: self.max_username_len,
            });
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AccountError::InvalidUsername);
        }
        Ok(())
    }

    pub fn validate_password(&self, password: &str) -> Result<(), AccountError> {
        if password.chars().count() < self.min_password_len {
            return Err(AccountError::PasswordTooShort {
                min: self.min_password_len,
            });
        }
        Ok(())
    }
}

/// Account operations over a shared [`UserStore`].
#[derive(Debug)]
pub struct UserService {
    store: Arc<UserStore>,
    policy: AccountPolicy,
}

impl UserService {
    pub fn new(store: Arc<UserStore>) -> Self {
        Self::with_policy(store, AccountPolicy::default())
    }

    pub fn with_policy(store: Arc<UserStore>, policy: AccountPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<UserStore> {
        &self.store
    }

    pub fn policy(&self) -> &AccountPolicy {
        &self.policy
    }

    /// Registers a new user.
    ///
    /// Hashing runs outside the store lock. The early `exists` check only
    /// skips hashing for obvious duplicates; `insert_if_absent` makes the
    /// final decision.
    pub fn register(&self, username: &str, password: &str) -> Result<Arc<User>, AccountError> {
        self.policy.validate_username(username)?;
        self.policy.validate_password(password)?;

        if self.store.exists(username) {
            return Err(AccountError::UsernameExists {
                username: username.to_string(),
            });
        }

        let hash = hash_password(password, self.policy.hash_cost)?;
        let user = self.store.insert_if_absent(username, hash)?;

        tracing::info!("Registered user {} (id={})", user.username, user.user_id);
        Ok(user)
    }

    /// Verifies credentials. Read-only.
    pub fn login(&self, username: &str, password: &str) -> Result<Arc<User>, AccountError> {
        let user = self.store.get(username)?;

        let matches = verify_password(password, &user.password_hash).map_err(|e| {
            tracing::error!("Stored hash for user {} is unreadable", user.user_id);
            e
        })?;
        if !matches {
            return Err(AccountError::WrongPassword);
        }

        tracing::debug!("User {} authenticated", user.username);
        Ok(user)
    }
}
