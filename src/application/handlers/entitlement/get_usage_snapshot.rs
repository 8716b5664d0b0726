//! GetUsageSnapshotHandler - read-only usage vs. quota for UI display.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::entitlement::{
    EntitlementError, FeatureKey, PeriodKey, PolicyCatalogue, QuotaStanding,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{MeteringStore, SubscriptionReader};

/// Query for a user's current position against a feature's quota.
#[derive(Debug, Clone)]
pub struct GetUsageSnapshotQuery {
    pub user_id: UserId,
    pub feature: FeatureKey,
}

/// Usage position for the active billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub feature: FeatureKey,
    pub period: PeriodKey,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub standing: QuotaStanding,
}

/// Handler for usage snapshots.
///
/// Read-only: consumes engine state for display and near-limit warnings
/// without affecting it.
pub struct GetUsageSnapshotHandler {
    store: Arc<dyn MeteringStore>,
    subscriptions: Arc<dyn SubscriptionReader>,
    policies: Arc<PolicyCatalogue>,
}

impl GetUsageSnapshotHandler {
    pub fn new(
        store: Arc<dyn MeteringStore>,
        subscriptions: Arc<dyn SubscriptionReader>,
        policies: Arc<PolicyCatalogue>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            policies,
        }
    }

    /// Snapshot against the current clock.
    pub async fn handle(
        &self,
        query: GetUsageSnapshotQuery,
    ) -> Result<UsageSnapshot, EntitlementError> {
        self.handle_at(query, Timestamp::now()).await
    }

    /// Snapshot against an explicit clock reading.
    pub async fn handle_at(
        &self,
        query: GetUsageSnapshotQuery,
        now: Timestamp,
    ) -> Result<UsageSnapshot, EntitlementError> {
        let subscription = self
            .subscriptions
            .subscription_for(&query.user_id)
            .await?
            .ok_or_else(|| EntitlementError::UnknownUser(query.user_id.clone()))?;

        let quota = self
            .policies
            .quota_for(subscription.tier, &query.feature)?;
        let period = PeriodKey::current(&subscription, now);
        let used = self
            .store
            .get_usage(&query.user_id, &query.feature, period)
            .await?;

        Ok(UsageSnapshot {
            feature: query.feature,
            period,
            used,
            limit: quota,
            remaining: quota.saturating_sub(used),
            standing: QuotaStanding::from_usage(used, quota),
        })
    }
}
