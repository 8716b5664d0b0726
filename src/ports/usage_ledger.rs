//! UsageLedger port - per-user, per-feature, per-period usage counters.
//!
//! One live counter exists per (user, feature, period) key. Counters are
//! created on first use, mutated only by atomic increment, and never
//! deleted within the retention window; counters for past periods are
//! audit history and are never mutated again.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::entitlement::{FeatureKey, PeriodKey};
use crate::domain::foundation::UserId;

/// Outcome of a ceiling-guarded usage increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCharge {
    /// The increment was applied; `new_count` reflects it.
    Charged { new_count: u64 },
    /// Applying the increment would have pushed the counter past the
    /// ceiling; nothing was written. `current` is the counter as
    /// observed inside the same atomic step.
    Exceeded { current: u64 },
}

impl QuotaCharge {
    /// Returns true if the increment was applied.
    pub fn is_charged(&self) -> bool {
        matches!(self, QuotaCharge::Charged { .. })
    }
}

/// Port for the usage ledger.
///
/// Implementations must make every increment atomic with respect to
/// concurrent callers on the same key: under N concurrent increments the
/// final count is the exact sum of all deltas, and each increment's
/// effect is visible to subsequent reads (linearizable per key). A
/// read-modify-write pair observable from other callers is forbidden.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Current count for a key. Zero when no record exists, which is how
    /// a fresh billing period presents itself: there is no reset step.
    async fn get_usage(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
    ) -> Result<u64, StoreError>;

    /// Atomic upsert-and-add: create-if-absent with `count = delta`,
    /// else add `delta`. Returns the new count. `delta` must be > 0.
    async fn increment_usage(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        delta: u64,
    ) -> Result<u64, StoreError>;

    /// Atomic add-if-the-result-stays-at-or-below-`ceiling`.
    ///
    /// This is the quota enforcement point: the check and the increment
    /// are one indivisible step, so no concurrent caller can observe a
    /// stale count and be admitted past the ceiling. `delta` must be > 0.
    async fn increment_usage_within(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        delta: u64,
        ceiling: u64,
    ) -> Result<QuotaCharge, StoreError>;
}
