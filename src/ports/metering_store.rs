//! MeteringStore port - both ledgers behind one transactional store.
//!
//! `Authorize` needs exactly one operation that spans both ledgers: pay
//! with credits and record the usage. That pair must commit or fail as a
//! unit; a debit without the matching usage record (or the reverse) is a
//! billing bug, so the combined step lives on the store where it can be
//! one critical section or one database transaction.

use async_trait::async_trait;

use super::{CreditLedger, StoreError, UsageLedger};
use crate::domain::entitlement::{FeatureKey, PeriodKey};
use crate::domain::foundation::UserId;

/// Outcome of a combined credit debit + usage increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditCharge {
    /// Debit and usage increment both committed.
    Charged {
        spent: u64,
        new_balance: u64,
        new_count: u64,
    },
    /// Balance was short by `shortfall`; neither ledger was touched.
    Insufficient { shortfall: u64 },
}

impl CreditCharge {
    /// Returns true if the charge committed.
    pub fn is_charged(&self) -> bool {
        matches!(self, CreditCharge::Charged { .. })
    }
}

/// Transactional store backing both ledgers.
///
/// Beyond the per-ledger contracts, implementations must make
/// `debit_and_record` all-or-nothing: on success both mutations are
/// visible, on `Insufficient` or error neither is. Partial application
/// must be structurally impossible, not merely unlikely.
#[async_trait]
pub trait MeteringStore: UsageLedger + CreditLedger {
    /// Debit-if-sufficient of `cost` credits, plus a usage increment of
    /// `quantity`, as one committed unit. The debit is recorded as a
    /// `subtraction_for_feature` entry against `feature`.
    ///
    /// `quantity` and `cost` must be > 0.
    async fn debit_and_record(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        quantity: u64,
        cost: u64,
    ) -> Result<CreditCharge, StoreError>;
}
