//! AuditCreditLedgerHandler - replay-vs-balance reconciliation.
//!
//! The credit ledger's defining invariant is that a user's balance
//! equals the sum of their entry deltas. This handler replays the entry
//! log and reports whether the stored balance agrees, for offline audits
//! and reconciliation jobs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::entitlement::EntitlementError;
use crate::domain::foundation::UserId;
use crate::ports::{replayed_balance, MeteringStore};

/// Query to audit one user's credit ledger.
#[derive(Debug, Clone)]
pub struct AuditCreditLedgerQuery {
    pub user_id: UserId,
}

/// Result of replaying a user's entry log against the stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditLedgerAudit {
    /// Balance as stored on the account.
    pub balance: u64,
    /// Balance as reconstructed from the entry log.
    pub replayed: i64,
    /// Number of entries replayed.
    pub entry_count: usize,
    /// True when the stored balance equals the replayed sum.
    pub consistent: bool,
}

/// Handler for credit ledger audits.
pub struct AuditCreditLedgerHandler {
    store: Arc<dyn MeteringStore>,
}

impl AuditCreditLedgerHandler {
    pub fn new(store: Arc<dyn MeteringStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: AuditCreditLedgerQuery,
    ) -> Result<CreditLedgerAudit, EntitlementError> {
        let balance = self.store.get_balance(&query.user_id).await?;
        let entries = self.store.entries_for(&query.user_id).await?;
        let replayed = replayed_balance(&entries);
        let consistent = replayed >= 0 && balance == replayed as u64;

        if !consistent {
            warn!(
                user_id = %query.user_id,
                balance,
                replayed,
                entry_count = entries.len(),
                "credit ledger replay disagrees with stored balance"
            );
        }

        Ok(CreditLedgerAudit {
            balance,
            replayed,
            entry_count: entries.len(),
            consistent,
        })
    }
}
