//! In-memory metering store.
//!
//! Both ledgers live behind a single `Mutex`, so every port operation is
//! one critical section: per-key increments are linearizable, debits
//! cannot interleave, and `debit_and_record` mutates both ledgers while
//! holding the same lock. The lock is never held across an `.await`.
//!
//! For production deployments requiring persistence, use
//! [`PostgresMeteringStore`](crate::adapters::postgres::PostgresMeteringStore)
//! instead.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::entitlement::{FeatureKey, PeriodKey};
use crate::domain::foundation::UserId;
use crate::ports::{
    CreditCharge, CreditLedger, CreditLedgerEntry, CreditReason, DebitOutcome, MeteringStore,
    QuotaCharge, StoreError, UsageLedger,
};

type UsageKey = (UserId, FeatureKey, PeriodKey);

#[derive(Default)]
struct LedgerState {
    usage: HashMap<UsageKey, u64>,
    balances: HashMap<UserId, u64>,
    entries: Vec<CreditLedgerEntry>,
}

impl LedgerState {
    fn add_usage(&mut self, user_id: &UserId, feature: &FeatureKey, period: PeriodKey, delta: u64) -> u64 {
        let count = self
            .usage
            .entry((user_id.clone(), feature.clone(), period))
            .or_insert(0);
        *count += delta;
        *count
    }

    fn append_entry(
        &mut self,
        user_id: &UserId,
        delta: i64,
        reason: CreditReason,
        related_feature: Option<&FeatureKey>,
    ) {
        self.entries.push(CreditLedgerEntry::new(
            user_id.clone(),
            delta,
            reason,
            related_feature.cloned(),
        ));
    }
}

/// In-memory implementation of the MeteringStore port.
///
/// Thread-safe via an internal `Mutex`. Does not persist data across
/// restarts.
#[derive(Default)]
pub struct InMemoryMeteringStore {
    state: Mutex<LedgerState>,
}

impl InMemoryMeteringStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all ledger entries across users, in append order.
    ///
    /// Useful for testing and debugging.
    pub fn entries(&self) -> Vec<CreditLedgerEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    /// Clears all counters, balances, and entries.
    ///
    /// Useful for testing scenarios that need a clean slate.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.usage.clear();
        state.balances.clear();
        state.entries.clear();
    }
}

#[async_trait]
impl UsageLedger for InMemoryMeteringStore {
    async fn get_usage(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
    ) -> Result<u64, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .usage
            .get(&(user_id.clone(), feature.clone(), period))
            .copied()
            .unwrap_or(0))
    }

    async fn increment_usage(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        delta: u64,
    ) -> Result<u64, StoreError> {
        debug_assert!(delta > 0);
        let mut state = self.state.lock().unwrap();
        Ok(state.add_usage(user_id, feature, period, delta))
    }

    async fn increment_usage_within(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        delta: u64,
        ceiling: u64,
    ) -> Result<QuotaCharge, StoreError> {
        debug_assert!(delta > 0);
        let mut state = self.state.lock().unwrap();
        let current = state
            .usage
            .get(&(user_id.clone(), feature.clone(), period))
            .copied()
            .unwrap_or(0);

        if current + delta > ceiling {
            return Ok(QuotaCharge::Exceeded { current });
        }

        let new_count = state.add_usage(user_id, feature, period, delta);
        Ok(QuotaCharge::Charged { new_count })
    }
}

#[async_trait]
impl CreditLedger for InMemoryMeteringStore {
    async fn get_balance(&self, user_id: &UserId) -> Result<u64, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(user_id).copied().unwrap_or(0))
    }

    async fn try_debit(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: CreditReason,
        related_feature: Option<&FeatureKey>,
    ) -> Result<DebitOutcome, StoreError> {
        debug_assert!(amount > 0);
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.get(user_id).copied().unwrap_or(0);

        if balance < amount {
            return Ok(DebitOutcome::Insufficient {
                shortfall: amount - balance,
            });
        }

        let new_balance = balance - amount;
        state.balances.insert(user_id.clone(), new_balance);
        state.append_entry(user_id, -(amount as i64), reason, related_feature);
        Ok(DebitOutcome::Debited { new_balance })
    }

    async fn credit(
        &self,
        user_id: &UserId,
        amount: u64,
        reason: CreditReason,
    ) -> Result<u64, StoreError> {
        debug_assert!(amount > 0);
        let mut state = self.state.lock().unwrap();
        let new_balance = state.balances.get(user_id).copied().unwrap_or(0) + amount;
        state.balances.insert(user_id.clone(), new_balance);
        state.append_entry(user_id, amount as i64, reason, None);
        Ok(new_balance)
    }

    async fn entries_for(&self, user_id: &UserId) -> Result<Vec<CreditLedgerEntry>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MeteringStore for InMemoryMeteringStore {
    async fn debit_and_record(
        &self,
        user_id: &UserId,
        feature: &FeatureKey,
        period: PeriodKey,
        quantity: u64,
        cost: u64,
    ) -> Result<CreditCharge, StoreError> {
        debug_assert!(quantity > 0 && cost > 0);
        let mut state = self.state.lock().unwrap();
        let balance = state.balances.get(user_id).copied().unwrap_or(0);

        if balance < cost {
            return Ok(CreditCharge::Insufficient {
                shortfall: cost - balance,
            });
        }

        let new_balance = balance - cost;
        state.balances.insert(user_id.clone(), new_balance);
        state.append_entry(
            user_id,
            -(cost as i64),
            CreditReason::SubtractionForFeature,
            Some(feature),
        );
        let new_count = state.add_usage(user_id, feature, period, quantity);

        Ok(CreditCharge::Charged {
            spent: cost,
            new_balance,
            new_count,
        })
    }
}
