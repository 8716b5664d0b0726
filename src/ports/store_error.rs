//! Storage error shared by the ledger and reader ports.

use thiserror::Error;

use crate::domain::entitlement::EntitlementError;

/// Infrastructure failure from a store implementation.
///
/// Business outcomes (quota exhausted, insufficient credits) never
/// travel through this type; they are values on the port contracts.
/// A store must raise this instead of guessing at "denied" or
/// "admitted" when it cannot answer, since either guess corrupts
/// accounting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transient failure (connection, timeout). Retryable; no mutation
    /// was partially applied.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be mapped back into domain types.
    #[error("stored data corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        StoreError::Corrupt(message.into())
    }
}

impl From<StoreError> for EntitlementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(m) => EntitlementError::StorageUnavailable(m),
            StoreError::Corrupt(m) => EntitlementError::StorageCorrupt(m),
        }
    }
}
