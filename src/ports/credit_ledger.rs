//! CreditLedger port - balances plus the append-only transaction log.
//!
//! Balances are mutated only through signed ledger entries, and for any
//! user the balance must always equal the sum of that user's entry
//! deltas. The replay invariant is checkable offline via `entries_for`
//! and [`replayed_balance`]; the audit handler does exactly that.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::StoreError;
use crate::domain::entitlement::FeatureKey;
use crate::domain::foundation::{LedgerEntryId, Timestamp, UserId};

/// Why a ledger entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditReason {
    /// Credit top-up settled by the checkout collaborator.
    Purchase,
    /// Debit paying for feature usage beyond quota.
    SubtractionForFeature,
    /// Credit returned after a refund.
    Refund,
    /// Support-initiated correction.
    ManualAdjustment,
}

impl CreditReason {
    /// Returns true if this reason may appear on a credit (positive) entry.
    pub fn is_grantable(&self) -> bool {
        !matches!(self, CreditReason::SubtractionForFeature)
    }
}

impl fmt::Display for CreditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CreditReason::Purchase => "purchase",
            CreditReason::SubtractionForFeature => "subtraction_for_feature",
            CreditReason::Refund => "refund",
            CreditReason::ManualAdjustment => "manual_adjustment",
        };
        write!(f, "{}", s)
    }
}

/// One append-only movement on a credit account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedgerEntry {
    pub id: LedgerEntryId,
    pub user_id: UserId,
    /// Signed movement: positive for grants, negative for debits.
    pub delta: i64,
    pub reason: CreditReason,
    /// Feature paid for, when the reason is a feature debit.
    pub related_feature: Option<FeatureKey>,
    pub created_at: Timestamp,
}

impl CreditLedgerEntry {
    pub fn new(
        user_id: UserId,
        delta: i64,
        reason: CreditReason,
        related_feature: Option<FeatureKey>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            user_id,
            delta,
            reason,
            related_feature,
            created_at: Timestamp::now(),
        }
    }
}

/// Outcome of an atomic debit-if-sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The debit was applied.
    Debited { new_balance: u64 },
    /// The balance was short by `shortfall`; nothing was written.
    Insufficient { shortfall: u64 },
}

impl DebitOutcome {
    /// Returns true if the debit was applied.
    pub fn is_debited(&self) -> bool {
        matches!(self, DebitOutcome::Debited { .. })
    }
}

/// Port for the credit ledger.
///
/// `try_debit` must check `balance >= amount` and apply the debit as one
/// indivisible step with respect to concurrent debits and credits on the
/// same account: two concurrent debits of 8 against a balance of 10 must
/// admit exactly one, and the balance can never go negative.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance. Zero for accounts that have never been credited.
    async fn get_balance(&self, user_id: &UserId) -> Result<u64, StoreError>;

    /// Atomic debit-if-sufficient. `amount` must be > 0.
    async fn try_debit(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: CreditReason,
        related_feature: Option<&FeatureKey>,
    ) -> Result<DebitOutcome, StoreError>;

    /// Appends a positive entry and returns the new balance. Always
    /// succeeds for a reachable store. `amount` must be > 0.
    async fn credit(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: CreditReason,
    ) -> Result<u64, StoreError>;

    /// The user's entries in append order, for audit replay.
    async fn entries_for(&self, user_id: &UserId) -> Result<Vec<CreditLedgerEntry>, StoreError>;
}

/// Replays an entry log into a balance.
///
/// For a consistent ledger the result is non-negative and equals the
/// stored balance.
pub fn replayed_balance(entries: &[CreditLedgerEntry]) -> i64 {
    entries.iter().map(|e| e.delta).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&CreditReason::SubtractionForFeature).unwrap();
        assert_eq!(json, "\"subtraction_for_feature\"");
    }

    #[test]
    fn debit_reason_is_not_grantable() {
        assert!(!CreditReason::SubtractionForFeature.is_grantable());
        assert!(CreditReason::Purchase.is_grantable());
        assert!(CreditReason::Refund.is_grantable());
        assert!(CreditReason::ManualAdjustment.is_grantable());
    }

    #[test]
    fn replay_sums_signed_deltas() {
        let entries = vec![
            CreditLedgerEntry::new(user(), 10, CreditReason::Purchase, None),
            CreditLedgerEntry::new(
                user(),
                -3,
                CreditReason::SubtractionForFeature,
                Some(FeatureKey::new("ai_recommendations").unwrap()),
            ),
            CreditLedgerEntry::new(user(), 2, CreditReason::Refund, None),
        ];
        assert_eq!(replayed_balance(&entries), 9);
    }

    #[test]
    fn replay_of_empty_log_is_zero() {
        assert_eq!(replayed_balance(&[]), 0);
    }

    #[test]
    fn debit_outcome_predicates() {
        assert!(DebitOutcome::Debited { new_balance: 2 }.is_debited());
        assert!(!DebitOutcome::Insufficient { shortfall: 1 }.is_debited());
    }
}
