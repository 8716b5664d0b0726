//! Entitlement-specific error types.
//!
//! Only configuration mistakes and infrastructure failures are errors
//! here. Quota exhaustion and insufficient credits are expected business
//! outcomes and live on [`Decision`](super::Decision) instead.

use thiserror::Error;

use super::FeatureKey;
use crate::domain::foundation::UserId;

/// Errors raised by the entitlement handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    /// No subscription exists for this user. Configuration error: the
    /// identity and billing collaborators disagree.
    #[error("no subscription found for user {0}")]
    UnknownUser(UserId),

    /// Feature is not registered in the policy catalogue. Requires a
    /// code or config fix, not a retry.
    #[error("feature '{0}' is not registered in the policy catalogue")]
    UnknownFeature(FeatureKey),

    /// Authorize was called with a zero quantity.
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    /// A credit grant was requested for a zero amount.
    #[error("credit amount must be greater than zero")]
    InvalidAmount,

    /// A credit grant was requested with a debit reason.
    #[error("'{0}' is not a valid reason for a credit grant")]
    InvalidGrantReason(String),

    /// Transient storage failure. Safe to retry; no ledger mutation was
    /// partially applied.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Stored ledger data could not be interpreted.
    #[error("stored ledger data corrupt: {0}")]
    StorageCorrupt(String),
}

impl EntitlementError {
    /// Returns true if the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EntitlementError::StorageUnavailable(_))
    }
}
