//! Account error types.

use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The username is already taken.
    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),

    /// Unknown username or wrong password. The two cases are not distinguished.
    #[error("Invalid username or old password")]
    InvalidCredentials,

    /// Database failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for AccountError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type for account operations.
pub type AccountResult<T> = Result<T, AccountError>;
