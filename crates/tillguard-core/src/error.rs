//! Error types for the access guard

use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors returned through a [`GuardHandle`](crate::driver::GuardHandle).
///
/// Wrong PINs, lockouts, store and verifier failures are not errors from the
/// caller's point of view; the guard turns those into notifications.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The driver task is gone
    #[error("Guard driver stopped")]
    DriverStopped,
}

/// Key-value store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// PIN verifier errors
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Infrastructure failure (network, timeout, backend down)
    #[error("Verifier unavailable: {0}")]
    Unavailable(String),

    /// The configured secret could not be parsed
    #[error("Invalid PIN hash: {0}")]
    InvalidHash(String),
}
