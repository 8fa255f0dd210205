use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Caller-facing classification of why a payment did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport-level failure talking to the provider.
    Network,
    /// The provider understood the call and declined it.
    ProviderRejected,
    /// A bounded wait expired before a response arrived.
    Timeout,
    /// Another transaction for the same payment attempt is still running.
    AlreadyInProgress,
    /// The payer cancelled or never approved. Not an error, but not a success.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::Timeout => "timeout",
            ErrorKind::AlreadyInProgress => "already_in_progress",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider rejected: {0}")]
    ProviderRejected(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Payment attempt {0} is already in progress")]
    AlreadyInProgress(String),
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
}

impl PaymentError {
    /// Builds the error a provider call would surface for `kind`.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Network => PaymentError::NetworkError(message),
            ErrorKind::ProviderRejected => PaymentError::ProviderRejected(message),
            ErrorKind::Timeout => PaymentError::Timeout(message),
            ErrorKind::AlreadyInProgress => PaymentError::AlreadyInProgress(message),
            // Cancellation is an outcome, never a provider error; a provider that
            // reports it is declining the order.
            ErrorKind::Cancelled => PaymentError::ProviderRejected(message),
        }
    }

    /// Maps the error onto the caller-facing taxonomy.
    ///
    /// Local faults (IO, storage, serialization) leave the remote outcome
    /// unknown, so they are classed with transport failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::ProviderRejected(_) | PaymentError::ValidationError(_) => {
                ErrorKind::ProviderRejected
            }
            PaymentError::Timeout(_) => ErrorKind::Timeout,
            PaymentError::AlreadyInProgress(_) => ErrorKind::AlreadyInProgress,
            _ => ErrorKind::Network,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
