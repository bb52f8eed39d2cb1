//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Update requested for a user other than the current default account's user.
    #[error("Account mismatch: default account user is {expected:?}, requested {requested}")]
    AccountMismatch {
        /// Username of the current default account, if any.
        expected: Option<String>,
        /// Username passed by the caller.
        requested: String,
    },

    /// An equivalent account already exists and update was not requested.
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// No registered account matches the identity.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Server base URL could not be turned into an authority.
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A registered account lacks a required metadata value.
    #[error("Account {account} has no {key} metadata")]
    MissingMetadata {
        /// Account identity.
        account: String,
        /// Metadata key.
        key: &'static str,
    },

    /// A use case is already running on this runner.
    #[error("Operation already in progress")]
    Busy,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::account::credentials::CredentialError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
