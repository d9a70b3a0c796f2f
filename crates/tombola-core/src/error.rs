//! Error types for tombola-core

use thiserror::Error;

/// Result type alias using tombola-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tombola-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The local store could not be opened; offline capability is
    /// unavailable for the session
    #[error("Offline storage unavailable: {0}")]
    StorageUnavailable(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Insert targeted an identifier that already exists in the collection
    #[error("Duplicate key '{id}' in collection '{collection}'")]
    DuplicateKey { collection: String, id: String },

    /// A single-item read or update target is not cached locally while
    /// offline
    #[error("Not available offline: {0}")]
    NotFoundOffline(String),

    /// HTTP transport error (timeout, refusal)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote API returned a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Bearer credential rejected (401); the session token has been cleared
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Queued file data could not be decoded back into bytes
    #[error("Upload decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
