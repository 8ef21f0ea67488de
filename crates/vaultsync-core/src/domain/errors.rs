//! Domain error types
//!
//! [`DomainError`] covers validation failures of domain values.
//! [`StoreError`] is the typed classification adapters attach to the
//! `anyhow::Error` they return from port methods, so the engine can tell
//! an expired credential from a missing object or a flaky network.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid vault-relative path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Classified failure raised by a store adapter
///
/// Adapters return `anyhow::Error`; when the failure has a meaning the
/// engine must react to, they wrap (or context-chain) one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Credentials were rejected; no further remote call can succeed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The addressed object or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A create-only write found an existing file
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Temporary failure (timeout, throttling, unavailable backend)
    #[error("Transient failure: {0}")]
    Transient(String),
}

impl StoreError {
    /// Finds a `StoreError` anywhere in the error's cause chain.
    pub fn find(err: &anyhow::Error) -> Option<&StoreError> {
        err.chain().find_map(|cause| cause.downcast_ref::<StoreError>())
    }

    /// True if the chain carries `NotFound` or an I/O `NotFound`.
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(cause.downcast_ref::<StoreError>(), Some(StoreError::NotFound(_)))
                || cause
                    .downcast_ref::<std::io::Error>()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
        })
    }

    /// True if the chain carries an authentication failure.
    pub fn is_auth(err: &anyhow::Error) -> bool {
        matches!(Self::find(err), Some(StoreError::Auth(_)))
    }
}
