//! Account error types.

use thiserror::Error;

/// Errors from registration and login.
///
/// The `Display` text is sent to clients as the response message, so it
/// never includes password material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("username too short: must be at least {min} characters")]
    UsernameTooShort { min: usize },

    #[error("username too long: must be at most {max} characters")]
    UsernameTooLong { max: usize },

    #[error("invalid username: only letters, digits and underscores are allowed")]
    InvalidUsername,

    #[error("password too short: must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("username already exists: {username}")]
    UsernameExists { username: String },

    #[error("user not found: {username}")]
    UserNotFound { username: String },

    #[error("wrong password")]
    WrongPassword,

    #[error("stored password hash is malformed")]
    MalformedHash,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl AccountError {
    /// Returns a stable code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccountError::UsernameTooShort { .. } => "USERNAME_TOO_SHORT",
            AccountError::UsernameTooLong { .. } => "USERNAME_TOO_LONG",
            AccountError::InvalidUsername => "INVALID_USERNAME",
            AccountError::PasswordTooShort { .. } => "PASSWORD_TOO_SHORT",
            AccountError::UsernameExists { .. } => "USERNAME_EXISTS",
            AccountError::UserNotFound { .. } => "USER_NOT_FOUND",
            AccountError::WrongPassword => "WRONG_PASSWORD",
            AccountError::MalformedHash => "MALFORMED_HASH",
            AccountError::Hashing(_) => "HASHING_FAILED",
        }
    }

    /// Returns true for server-side faults rather than client mistakes.
    pub fn is_internal(&self) -> bool {
        matches!(self, AccountError::MalformedHash | AccountError::Hashing(_))
    }

    /// Returns true for rejected input, false for state conflicts and
    /// credential mismatches.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AccountError::UsernameTooShort { .. }
                | AccountError::UsernameTooLong { .. }
                | AccountError::InvalidUsername
                | AccountError::PasswordTooShort { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_keywords() {
        assert!(AccountError::UsernameTooShort { min: 3 }
            .to_string()
            .contains("too short"));
        assert!(AccountError::UsernameExists {
            username: "alice".into()
        }
        .to_string()
        .contains("exists"));
        assert!(AccountError::UserNotFound {
            username: "bob".into()
        }
        .to_string()
        .contains("not found"));
        assert!(AccountError::WrongPassword.to_string().contains("password"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(AccountError::InvalidUsername.is_validation());
        assert!(AccountError::PasswordTooShort { min: 6 }.is_validation());
        assert!(!AccountError::WrongPassword.is_validation());
        assert!(!AccountError::UsernameExists {
            username: "x".into()
        }
        .is_validation());
    }

    #[test]
    fn test_internal_classification() {
        assert!(AccountError::MalformedHash.is_internal());
        assert!(AccountError::Hashing("cost".into()).is_internal());
        assert!(!AccountError::WrongPassword.is_internal());
        assert!(!AccountError::InvalidUsername.is_internal());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AccountError::WrongPassword.error_code(), "WRONG_PASSWORD");
        assert_eq!(
            AccountError::UsernameTooLong { max: 50 }.error_code(),
            "USERNAME_TOO_LONG"
        );
    }
}
